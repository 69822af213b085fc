//! Job files for the command line
//!
//! ```toml
//! [process]
//! algorithm = "Polynomial"
//! order = 2
//! target_srs = "3857"
//! pixel_width = 10.0
//! output_format = "GTiff"
//! resampling = "bilinear"
//! ```
//!
//! Every key is optional; command-line flags take precedence.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::errors::{GeorefError, GeorefResult};

const KNOWN_KEYS: [&str; 9] = [
    "algorithm", "order", "target_srs", "width", "height",
    "pixel_width", "pixel_height", "output_format", "resampling",
];

/// Settings of the `[process]` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobConfig {
    pub algorithm: Option<String>,
    pub order: Option<u32>,
    pub target_srs: Option<String>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub pixel_width: Option<f64>,
    pub pixel_height: Option<f64>,
    pub output_format: Option<String>,
    pub resampling: Option<String>,
}

impl JobConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> GeorefResult<Self> {
        let path = path.as_ref();
        info!("Loading job file {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> GeorefResult<Self> {
        let toml_value: toml::Value = content.parse()?;
        let table = match toml_value.get("process") {
            Some(value) => value.as_table()
                .ok_or_else(|| GeorefError::Config("[process] must be a table".to_string()))?,
            None => {
                warn!("Job file has no [process] table");
                return Ok(JobConfig::default());
            }
        };

        for key in table.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
            warn!("Ignoring unknown job setting '{}'", key);
        }

        Ok(JobConfig {
            algorithm: text(table, "algorithm")?,
            order: count(table, "order")?.map(|v| v as u32),
            target_srs: match table.get("target_srs") {
                // EPSG codes may be written as numbers
                Some(toml::Value::Integer(code)) => Some(code.to_string()),
                _ => text(table, "target_srs")?,
            },
            width: count(table, "width")?.map(|v| v as usize),
            height: count(table, "height")?.map(|v| v as usize),
            pixel_width: number(table, "pixel_width")?,
            pixel_height: number(table, "pixel_height")?,
            output_format: text(table, "output_format")?,
            resampling: text(table, "resampling")?,
        })
    }
}

fn text(table: &toml::value::Table, key: &str) -> GeorefResult<Option<String>> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value.as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| GeorefError::Config(format!("'{}' must be a string", key))),
    }
}

fn count(table: &toml::value::Table, key: &str) -> GeorefResult<Option<u64>> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => match value.as_integer() {
            Some(v) if v > 0 => Ok(Some(v as u64)),
            _ => Err(GeorefError::Config(format!("'{}' must be a positive integer", key))),
        },
    }
}

fn number(table: &toml::value::Table, key: &str) -> GeorefResult<Option<f64>> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => match value.as_float().or_else(|| value.as_integer().map(|v| v as f64)) {
            Some(v) if v > 0.0 => Ok(Some(v)),
            _ => Err(GeorefError::Config(format!("'{}' must be a positive number", key))),
        },
    }
}
