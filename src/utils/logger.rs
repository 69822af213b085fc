//! File-backed logger for the command line
//!
//! Records go to a log file and are echoed to the console. Installed as
//! the global `log` backend unless `RUST_LOG` selects `env_logger`.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Log, Record, Level, Metadata};

pub struct Logger {
    file: Mutex<Option<File>>,
    level: Level,
}

impl Logger {
    /// Create a logger writing to `log_file`
    pub fn new<P: AsRef<Path>>(log_file: P, level: Level) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level,
        })
    }

    /// Append one line to the log file
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Install a file logger as the global `log` backend
    pub fn init_global_logger<P: AsRef<Path>>(log_file: P, level: Level) -> io::Result<()> {
        let global_logger = Logger::new(log_file, level)?;

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(level.to_level_filter());
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.write_line(&message);

            if record.level() <= Level::Info || self.level > Level::Info {
                println!("{}", message);
            }
        }
    }

    fn flush(&self) {}
}

/// Level for the verbosity flag
pub fn level_for(verbose: bool) -> Level {
    if verbose { Level::Debug } else { Level::Info }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("georefkit.log");
        let logger = Logger::new(&path, Level::Info).unwrap();
        logger.write_line("[INFO] first").unwrap();
        logger.write_line("[WARN] second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["[INFO] first", "[WARN] second"]);
        assert!(logger.enabled(&Metadata::builder().level(Level::Warn).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Debug).build()));
    }
}
