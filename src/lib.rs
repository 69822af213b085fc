pub mod errors;
pub mod utils;
pub mod compression;
pub mod coordinate;
pub mod model;
pub mod transformation;
pub mod gcp;
pub mod driver;
pub mod raster;
pub mod warp;
pub mod commands;

pub use errors::{GeorefError, GeorefResult};
pub use coordinate::{Coordinates, CoordinateSystem, CoordinateSystemFactory, Subset};
pub use model::RasterSpatialModel;
pub use transformation::{CoordinatesTransformation, TransformationFactory};
pub use gcp::{GcpList, GroundControlPoint, GroundControlPointExtended, TextFileGcpLoader};
pub use driver::GcpDriver;
pub use raster::{Dataset, RasterDriver};
pub use warp::{GeoreferenceProcess, Process, ReprojectionProcess};
