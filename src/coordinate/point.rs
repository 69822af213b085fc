//! Coordinate triple used for both world and pixel/line space

use std::fmt;

/// A point in world or pixel/line space
///
/// The meaning of the axes depends on context: for raster space `x` is the
/// pixel (column) and `y` the line (row); for world space they are the
/// easting/longitude and northing/latitude of the reference system.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinates {
    /// X coordinate (pixel, easting or longitude)
    pub x: f64,
    /// Y coordinate (line, northing or latitude)
    pub y: f64,
    /// Z coordinate (elevation, 0 when unknown)
    pub z: f64,
}

impl Coordinates {
    /// Create a new 2D coordinate (z = 0)
    pub fn new(x: f64, y: f64) -> Self {
        Coordinates { x, y, z: 0.0 }
    }

    /// Create a new 3D coordinate
    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Coordinates { x, y, z }
    }

    /// Planar distance to another coordinate, ignoring z
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when both planar components are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Compare planar components within a tolerance
    pub fn approx_eq(&self, other: &Coordinates, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn test_finite() {
        assert!(Coordinates::new(1.0, 2.0).is_finite());
        assert!(!Coordinates::new(f64::NAN, 2.0).is_finite());
    }
}
