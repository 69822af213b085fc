//! Coordinate handling for geospatial data
//!
//! This module provides the coordinate and window value types shared by the
//! rest of the crate, plus spatial reference identification and the exact
//! conversions between supported reference systems.

mod point;
mod subset;
mod crs;
mod transform;

pub use self::point::Coordinates;
pub use self::subset::Subset;
pub use self::crs::{is_same_reference, CoordinateSystem, CoordinateSystemFactory, SrsCatalog, SrsEntry};
pub use self::transform::{web_mercator_to_wgs84, wgs84_to_web_mercator, CoordinateTransformer, EARTH_RADIUS};
