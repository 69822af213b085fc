//! Custom error types for georeferencing operations

use std::fmt;
use std::io;

/// Georeferencing error types
#[derive(Debug)]
pub enum GeorefError {
    /// I/O error
    IoError(io::Error),
    /// Malformed WKT text
    Wkt(String),
    /// Non-invertible or otherwise unusable raster model
    Model(String),
    /// Transformation could not be created or applied
    Transformation(String),
    /// A GCP file line could not be parsed
    GcpParse {
        /// 1-based line number
        line: usize,
        /// Offending line text
        text: String,
        /// What went wrong
        message: String,
    },
    /// Unknown or unsupported output driver
    UnsupportedDriver(String),
    /// Raster dataset error (open/create/read)
    Raster(String),
    /// Warp stage error
    Warp(String),
    /// XML serialization error
    Xml(String),
    /// Configuration error
    Config(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for GeorefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeorefError::IoError(e) => write!(f, "I/O error: {}", e),
            GeorefError::Wkt(msg) => write!(f, "WKT error: {}", msg),
            GeorefError::Model(msg) => write!(f, "Raster model error: {}", msg),
            GeorefError::Transformation(msg) => write!(f, "Transformation error: {}", msg),
            GeorefError::GcpParse { line, text, message } => {
                write!(f, "GCP parse error at line {}: {} ({:?})", line, message, text)
            }
            GeorefError::UnsupportedDriver(name) => write!(f, "Unsupported raster driver: {}", name),
            GeorefError::Raster(msg) => write!(f, "Raster error: {}", msg),
            GeorefError::Warp(msg) => write!(f, "Warp error: {}", msg),
            GeorefError::Xml(msg) => write!(f, "XML error: {}", msg),
            GeorefError::Config(msg) => write!(f, "Configuration error: {}", msg),
            GeorefError::GenericError(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GeorefError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeorefError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GeorefError {
    fn from(error: io::Error) -> Self {
        GeorefError::IoError(error)
    }
}

impl From<String> for GeorefError {
    fn from(msg: String) -> Self {
        GeorefError::GenericError(msg)
    }
}

impl From<quick_xml::Error> for GeorefError {
    fn from(error: quick_xml::Error) -> Self {
        GeorefError::Xml(error.to_string())
    }
}

impl From<image::ImageError> for GeorefError {
    fn from(error: image::ImageError) -> Self {
        GeorefError::Raster(error.to_string())
    }
}

impl From<toml::de::Error> for GeorefError {
    fn from(error: toml::de::Error) -> Self {
        GeorefError::Config(error.to_string())
    }
}

/// Result type for georeferencing operations
pub type GeorefResult<T> = Result<T, GeorefError>;
