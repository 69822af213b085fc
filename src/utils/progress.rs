use indicatif::{ProgressBar, ProgressStyle};

/// Steps of the bar; pipeline fractions are scaled onto it
const STEPS: u64 = 1000;

pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(description: &str) -> Self {
        let bar = ProgressBar::new(STEPS);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(description.to_string());

        ProgressTracker {
            bar,
        }
    }

    /// A tracker that draws nothing
    pub fn hidden() -> Self {
        ProgressTracker { bar: ProgressBar::hidden() }
    }

    /// Move the bar to a completed fraction in [0, 1]
    pub fn update(&self, fraction: f64) {
        let position = (fraction.clamp(0.0, 1.0) * STEPS as f64).round() as u64;
        self.bar.set_position(position.max(self.bar.position()));
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }

    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_never_goes_back() {
        let tracker = ProgressTracker::hidden();
        tracker.update(0.5);
        assert_eq!(tracker.position(), 500);
        tracker.update(0.25);
        assert_eq!(tracker.position(), 500);
        tracker.update(3.0);
        assert_eq!(tracker.position(), STEPS);
    }
}
