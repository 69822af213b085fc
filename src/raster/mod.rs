//! Raster datasets and the drivers that read and write them

mod dataset;
mod driver;
pub mod gtiff;
pub mod png;

pub use self::dataset::{ColorTable, DataType, Dataset, RasterBand};
pub use self::driver::RasterDriver;
