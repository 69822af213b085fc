//! Ground control point value types

use crate::coordinate::Coordinates;

/// Paired source/destination coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundControlPoint {
    source: Coordinates,
    destination: Coordinates,
}

impl GroundControlPoint {
    /// Create a new control point
    pub fn new(source: Coordinates, destination: Coordinates) -> Self {
        GroundControlPoint { source, destination }
    }

    /// Source coordinate (usually pixel/line of the image being warped)
    pub fn source(&self) -> Coordinates {
        self.source
    }

    /// Destination coordinate (base image pixel/line or world position)
    pub fn destination(&self) -> Coordinates {
        self.destination
    }
}

/// Control point with an enable flag
///
/// Disabled points stay in the list but are left out of model fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundControlPointExtended {
    point: GroundControlPoint,
    enabled: bool,
}

impl GroundControlPointExtended {
    /// Create an enabled control point
    pub fn new(source: Coordinates, destination: Coordinates) -> Self {
        GroundControlPointExtended {
            point: GroundControlPoint::new(source, destination),
            enabled: true,
        }
    }

    /// Create a control point with an explicit enable flag
    pub fn with_enabled(source: Coordinates, destination: Coordinates, enabled: bool) -> Self {
        GroundControlPointExtended {
            point: GroundControlPoint::new(source, destination),
            enabled,
        }
    }

    /// Source coordinate
    pub fn source(&self) -> Coordinates {
        self.point.source()
    }

    /// Destination coordinate
    pub fn destination(&self) -> Coordinates {
        self.point.destination()
    }

    /// Whether the point takes part in fitting
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the point
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The plain source/destination pair
    pub fn point(&self) -> GroundControlPoint {
        self.point
    }
}

impl From<GroundControlPoint> for GroundControlPointExtended {
    fn from(point: GroundControlPoint) -> Self {
        GroundControlPointExtended { point, enabled: true }
    }
}
