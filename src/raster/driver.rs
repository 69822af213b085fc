//! Raster drivers by name

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info};

use crate::compression::Compression;
use crate::errors::{GeorefError, GeorefResult};
use super::gtiff::{GeoTiffReader, GeoTiffWriter};
use super::{png, DataType, Dataset};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Output/input format of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterDriver {
    /// In-memory only
    Mem,
    /// GeoTIFF with the given strip compression
    GTiff { compression: Compression },
    /// Non-georeferenced PNG
    Png,
}

impl RasterDriver {
    /// Driver by its short name (case-insensitive)
    pub fn by_name(name: &str) -> GeorefResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "mem" => Ok(RasterDriver::Mem),
            "gtiff" | "geotiff" | "tif" | "tiff" => Ok(RasterDriver::GTiff { compression: Compression::None }),
            "png" => Ok(RasterDriver::Png),
            _ => Err(GeorefError::UnsupportedDriver(name.to_string())),
        }
    }

    /// Short name of the driver
    pub fn name(&self) -> &'static str {
        match self {
            RasterDriver::Mem => "MEM",
            RasterDriver::GTiff { .. } => "GTiff",
            RasterDriver::Png => "PNG",
        }
    }

    /// Usual file extension, empty for `Mem`
    pub fn extension(&self) -> &'static str {
        match self {
            RasterDriver::Mem => "",
            RasterDriver::GTiff { .. } => "tif",
            RasterDriver::Png => "png",
        }
    }

    /// Whether files written by the driver keep georeferencing
    pub fn is_georeferenced(&self) -> bool {
        !matches!(self, RasterDriver::Png)
    }

    /// New zero-filled dataset
    pub fn create(&self, width: usize, height: usize, bands: usize, data_type: DataType) -> Dataset {
        Dataset::new(width, height, bands, data_type)
    }

    /// Write a copy of `dataset` to `path`
    pub fn create_copy<P: AsRef<Path>>(&self, dataset: &Dataset, path: P) -> GeorefResult<()> {
        let path = path.as_ref();
        info!("Creating {} copy at {}", self.name(), path.display());
        match self {
            RasterDriver::Mem => Err(GeorefError::UnsupportedDriver(
                "MEM datasets cannot be written to a file".to_string())),
            RasterDriver::GTiff { compression } => GeoTiffWriter::new(*compression).write(dataset, path),
            RasterDriver::Png => png::write(dataset, path),
        }
    }

    /// Driver able to read `path`, detected from the file signature
    pub fn identify<P: AsRef<Path>>(path: P) -> GeorefResult<Self> {
        let path = path.as_ref();
        let mut signature = [0u8; 8];
        let read = File::open(path)?.read(&mut signature)?;
        let signature = &signature[..read];

        if signature.starts_with(b"II*\0") || signature.starts_with(b"MM\0*")
            || signature.starts_with(b"II+\0") || signature.starts_with(b"MM\0+") {
            Ok(RasterDriver::GTiff { compression: Compression::None })
        } else if signature == PNG_SIGNATURE {
            Ok(RasterDriver::Png)
        } else {
            Err(GeorefError::UnsupportedDriver(format!("Unrecognized raster format: {}", path.display())))
        }
    }

    /// Open a raster file with the driver matching its signature
    pub fn open<P: AsRef<Path>>(path: P) -> GeorefResult<Dataset> {
        let path = path.as_ref();
        let driver = Self::identify(path)?;
        debug!("Opening {} with {}", path.display(), driver.name());
        match driver {
            RasterDriver::GTiff { .. } => GeoTiffReader::read(path),
            RasterDriver::Png => png::read(path),
            RasterDriver::Mem => Err(GeorefError::UnsupportedDriver("MEM".to_string())),
        }
    }
}

impl fmt::Display for RasterDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
