//! Exact conversions between supported coordinate systems

use std::f64::consts::PI;

use log::trace;

use super::crs::CoordinateSystem;
use super::point::Coordinates;

/// Earth radius in meters used by the spherical Mercator formulas
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude limit of the Web Mercator square
pub const MAX_MERCATOR_LATITUDE: f64 = 85.06;

/// Point converter between two coordinate systems
///
/// Only pairs with closed-form conversions are supported; `new` returns
/// `None` for anything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    from: CoordinateSystem,
    to: CoordinateSystem,
}

impl CoordinateTransformer {
    /// Create a converter, if the pair is supported
    pub fn new(from: CoordinateSystem, to: CoordinateSystem) -> Option<Self> {
        if Self::is_supported(&from, &to) {
            Some(CoordinateTransformer { from, to })
        } else {
            None
        }
    }

    /// Whether a conversion between the two systems is available
    pub fn is_supported(from: &CoordinateSystem, to: &CoordinateSystem) -> bool {
        if from == to && *from != CoordinateSystem::Unknown {
            return true;
        }
        matches!(
            (from, to),
            (CoordinateSystem::WGS84, CoordinateSystem::WebMercator)
                | (CoordinateSystem::WebMercator, CoordinateSystem::WGS84)
        )
    }

    /// Source system
    pub fn source(&self) -> CoordinateSystem {
        self.from
    }

    /// Destination system
    pub fn destination(&self) -> CoordinateSystem {
        self.to
    }

    /// The converter for the opposite direction
    pub fn inverse(&self) -> CoordinateTransformer {
        CoordinateTransformer { from: self.to, to: self.from }
    }

    /// Convert a point, returning `None` when the result is not finite
    pub fn transform(&self, point: &Coordinates) -> Option<Coordinates> {
        let result = match (self.from, self.to) {
            (a, b) if a == b => *point,
            (CoordinateSystem::WGS84, CoordinateSystem::WebMercator) => {
                wgs84_to_web_mercator(point.x, point.y)
            }
            (CoordinateSystem::WebMercator, CoordinateSystem::WGS84) => {
                web_mercator_to_wgs84(point.x, point.y)
            }
            _ => return None,
        };

        if result.is_finite() {
            Some(Coordinates::new_3d(result.x, result.y, point.z))
        } else {
            None
        }
    }
}

/// Convert coordinates from WGS84 (EPSG:4326) to Web Mercator (EPSG:3857)
///
/// Latitude is clamped to the valid Web Mercator range.
pub fn wgs84_to_web_mercator(lon: f64, lat: f64) -> Coordinates {
    let lat_constrained = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);

    let x = lon * PI * EARTH_RADIUS / 180.0;
    let lat_rad = lat_constrained * PI / 180.0;
    let y = EARTH_RADIUS * f64::ln(f64::tan(PI / 4.0 + lat_rad / 2.0));

    trace!("Transformed WGS84 ({}, {}) to Web Mercator ({}, {})", lon, lat, x, y);

    Coordinates::new(x, y)
}

/// Convert coordinates from Web Mercator (EPSG:3857) to WGS84 (EPSG:4326)
pub fn web_mercator_to_wgs84(x: f64, y: f64) -> Coordinates {
    let lon = (x * 180.0) / (EARTH_RADIUS * PI);
    let lat = (2.0 * f64::atan(f64::exp(y / EARTH_RADIUS)) - PI / 2.0) * 180.0 / PI;

    trace!("Transformed Web Mercator ({}, {}) to WGS84 ({}, {})", x, y, lon, lat);

    Coordinates::new(lon, lat)
}
