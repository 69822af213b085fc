//! GeoTIFF driver
//!
//! Reads and writes single-image GeoTIFF files with affine or tiepoint
//! georeferencing, GeoKey spatial references and GDAL metadata tags.

mod byte_order;
mod constants;
mod geokeys;
mod ifd;
mod metadata;
mod reader;
mod writer;

pub use self::byte_order::ByteOrder;
pub use self::reader::GeoTiffReader;
pub use self::writer::GeoTiffWriter;
