//! Axis-aligned window defined by two opposite corners

use super::point::Coordinates;

/// A rectangular window in world or pixel/line space
///
/// `ul` and `lr` are opposite corners. The axis order is kept as supplied,
/// so for north-up world extents `ul.y > lr.y` while for pixel/line windows
/// `ul.y < lr.y`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Subset {
    /// Upper-left corner
    pub ul: Coordinates,
    /// Lower-right corner
    pub lr: Coordinates,
}

impl Subset {
    /// Create a new subset from its corners
    pub fn new(ul: Coordinates, lr: Coordinates) -> Self {
        Subset { ul, lr }
    }

    /// Create a subset from scalar corner values
    pub fn from_corners(ulx: f64, uly: f64, lrx: f64, lry: f64) -> Self {
        Subset {
            ul: Coordinates::new(ulx, uly),
            lr: Coordinates::new(lrx, lry),
        }
    }

    /// Parse a subset from a string (format: "ulx,uly,lrx,lry")
    pub fn from_string(subset_str: &str) -> Result<Self, String> {
        let parts: Vec<&str> = subset_str.split(',').collect();
        if parts.len() != 4 {
            return Err("Subset must have 4 comma-separated values".to_string());
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(parts.iter()) {
            *value = part.trim().parse::<f64>()
                .map_err(|_| format!("Invalid subset value: {}", part.trim()))?;
        }

        Ok(Subset::from_corners(values[0], values[1], values[2], values[3]))
    }

    /// Absolute width of the window
    pub fn width(&self) -> f64 {
        (self.lr.x - self.ul.x).abs()
    }

    /// Absolute height of the window
    pub fn height(&self) -> f64 {
        (self.lr.y - self.ul.y).abs()
    }

    /// Minimum x of the window
    pub fn min_x(&self) -> f64 {
        self.ul.x.min(self.lr.x)
    }

    /// Maximum x of the window
    pub fn max_x(&self) -> f64 {
        self.ul.x.max(self.lr.x)
    }

    /// Minimum y of the window
    pub fn min_y(&self) -> f64 {
        self.ul.y.min(self.lr.y)
    }

    /// Maximum y of the window
    pub fn max_y(&self) -> f64 {
        self.ul.y.max(self.lr.y)
    }

    /// Center of the window
    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.ul.x + self.lr.x) / 2.0,
            (self.ul.y + self.lr.y) / 2.0,
        )
    }

    /// True when the corners are finite and the window has a non-zero area
    pub fn is_valid(&self) -> bool {
        self.ul.is_finite() && self.lr.is_finite() && self.width() > 0.0 && self.height() > 0.0
    }

    /// The same extent expressed north-up (`ul` = min x / max y)
    pub fn normalized(&self) -> Subset {
        Subset::from_corners(self.min_x(), self.max_y(), self.max_x(), self.min_y())
    }

    /// Check if this window contains a point (edges included)
    pub fn contains(&self, point: &Coordinates) -> bool {
        point.x >= self.min_x() && point.x <= self.max_x()
            && point.y >= self.min_y() && point.y <= self.max_y()
    }

    /// Smallest window containing every point, in pixel/line orientation
    ///
    /// Returns `None` for an empty iterator.
    pub fn enclosing<'a, I>(points: I) -> Option<Subset>
    where
        I: IntoIterator<Item = &'a Coordinates>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in iter {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(Subset::from_corners(min_x, min_y, max_x, max_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subset() {
        let subset = Subset::from_string("10, 20, 30, 5").unwrap();
        assert_eq!(subset.ul, Coordinates::new(10.0, 20.0));
        assert_eq!(subset.lr, Coordinates::new(30.0, 5.0));
        assert!(Subset::from_string("1,2,3").is_err());
        assert!(Subset::from_string("1,2,x,4").is_err());
    }

    #[test]
    fn test_dimensions_ignore_axis_direction() {
        let world = Subset::from_corners(100.0, 50.0, 200.0, 0.0);
        assert_eq!(world.width(), 100.0);
        assert_eq!(world.height(), 50.0);
        assert!(world.is_valid());
        assert!(world.contains(&Coordinates::new(150.0, 25.0)));
    }

    #[test]
    fn test_normalized_is_north_up() {
        let pixel_like = Subset::from_corners(0.0, 0.0, 10.0, 20.0);
        let north_up = pixel_like.normalized();
        assert_eq!(north_up.ul, Coordinates::new(0.0, 20.0));
        assert_eq!(north_up.lr, Coordinates::new(10.0, 0.0));
    }

    #[test]
    fn test_enclosing() {
        let points = vec![
            Coordinates::new(3.0, -1.0),
            Coordinates::new(-2.0, 4.0),
            Coordinates::new(0.0, 0.0),
        ];
        let subset = Subset::enclosing(&points).unwrap();
        assert_eq!(subset, Subset::from_corners(-2.0, -1.0, 3.0, 4.0));
        assert!(Subset::enclosing(&Vec::<Coordinates>::new()).is_none());
    }
}
