//! Raster spatial model
//!
//! Exact, invertible affine mapping between raster pixel/line space and a
//! planar or geographic coordinate system. The reference system itself is
//! carried separately as WKT.

mod parameters;
mod raster_model;

pub use self::parameters::{matrix_index, parameters_to_wkt, wkt_to_parameters, Parameters, PixelModel};
pub use self::raster_model::RasterSpatialModel;
