//! Plain-text GCP file persistence
//!
//! File layout:
//!
//! ```text
//! ;source_spatialreference_wkt=GEOGCS[...]
//! ;destination_spatialreference_wkt=PROJCS[...]
//! 10.5	20.25	-58.1	-34.6	ON
//! 110	20	-58.0	-34.6	OFF
//! ```
//!
//! Lines starting with `;` are comments; those of the form `key=value` with a
//! known key set list attributes. Every other non-blank line is a point made
//! of single-tab-separated `source-x`, `source-y`, `destination-x`, `destination-y`
//! and an optional enable token (`ON` enables, anything else disables).

use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::coordinate::Coordinates;
use crate::errors::{GeorefError, GeorefResult};
use super::list::GcpList;
use super::point::GroundControlPointExtended;

/// Comment prefix
pub const COMMENT_PREFIX: char = ';';
/// Token that marks an enabled point
pub const ENABLED_TOKEN: &str = "ON";
/// Token written for a disabled point
pub const DISABLED_TOKEN: &str = "OFF";

/// Attribute keys understood in `;key=value` comments
pub mod keys {
    pub const SOURCE_SRS: &str = "source_spatialreference_wkt";
    pub const DESTINATION_SRS: &str = "destination_spatialreference_wkt";
    pub const SOURCE_RASTER_MODEL: &str = "source_rastermodel_wkt";
    pub const DESTINATION_RASTER_MODEL: &str = "destination_rastermodel_wkt";
    pub const BASE_DATASOURCE: &str = "base_datasource";
    pub const WARP_DATASOURCE: &str = "warp_datasource";
    pub const TRANSFORMATION_NAME: &str = "transformation_name";
    pub const TRANSFORMATION_PARAMETERS: &str = "transformation_parameters";
}

/// Reads and writes GCP lists as tab-separated text
pub struct TextFileGcpLoader;

impl TextFileGcpLoader {
    /// Load a GCP list from a file
    pub fn load<P: AsRef<Path>>(path: P) -> GeorefResult<GcpList> {
        let path = path.as_ref();
        info!("Loading GCP file: {}", path.display());
        let content = fs::read_to_string(path)?;
        let list = Self::load_from_str(&content)?;
        info!("Loaded {} control points ({} enabled)", list.len(), list.enabled_count());
        Ok(list)
    }

    /// Parse a GCP list from text
    ///
    /// The first line that is neither a comment nor a valid point aborts the
    /// load with its 1-based line number.
    pub fn load_from_str(content: &str) -> GeorefResult<GcpList> {
        let mut list = GcpList::new();

        for (index, raw_line) in content.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix(COMMENT_PREFIX) {
                Self::apply_comment(&mut list, comment, line_number);
                continue;
            }

            let point = Self::parse_point(line).map_err(|message| GeorefError::GcpParse {
                line: line_number,
                text: raw_line.to_string(),
                message,
            })?;
            list.add(point);
        }

        Ok(list)
    }

    /// Save a GCP list to a file
    pub fn save<P: AsRef<Path>>(path: P, list: &GcpList) -> GeorefResult<()> {
        let path = path.as_ref();
        info!("Saving {} control points to {}", list.len(), path.display());
        fs::write(path, Self::to_text(list))?;
        Ok(())
    }

    /// Render a GCP list in file format
    pub fn to_text(list: &GcpList) -> String {
        let attributes = [
            (keys::SOURCE_SRS, &list.source_srs_wkt),
            (keys::DESTINATION_SRS, &list.destination_srs_wkt),
            (keys::SOURCE_RASTER_MODEL, &list.source_raster_model_wkt),
            (keys::DESTINATION_RASTER_MODEL, &list.destination_raster_model_wkt),
            (keys::BASE_DATASOURCE, &list.base_datasource),
            (keys::WARP_DATASOURCE, &list.warp_datasource),
            (keys::TRANSFORMATION_NAME, &list.transformation_name),
            (keys::TRANSFORMATION_PARAMETERS, &list.transformation_parameters),
        ];

        let mut text = String::new();
        for (key, value) in attributes {
            if !value.is_empty() {
                // values must stay on a single line
                let single_line = value.replace(['\r', '\n'], " ");
                text.push_str(&format!("{}{}={}\n", COMMENT_PREFIX, key, single_line));
            }
        }

        for point in list.points() {
            let source = point.source();
            let destination = point.destination();
            text.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                source.x, source.y, destination.x, destination.y,
                if point.is_enabled() { ENABLED_TOKEN } else { DISABLED_TOKEN }
            ));
        }

        text
    }

    fn apply_comment(list: &mut GcpList, comment: &str, line_number: usize) {
        let (key, value) = match comment.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => {
                debug!("Plain comment at line {}", line_number);
                return;
            }
        };

        let target = match key {
            keys::SOURCE_SRS => &mut list.source_srs_wkt,
            keys::DESTINATION_SRS => &mut list.destination_srs_wkt,
            keys::SOURCE_RASTER_MODEL => &mut list.source_raster_model_wkt,
            keys::DESTINATION_RASTER_MODEL => &mut list.destination_raster_model_wkt,
            keys::BASE_DATASOURCE => &mut list.base_datasource,
            keys::WARP_DATASOURCE => &mut list.warp_datasource,
            keys::TRANSFORMATION_NAME => &mut list.transformation_name,
            keys::TRANSFORMATION_PARAMETERS => &mut list.transformation_parameters,
            _ => {
                warn!("Ignoring unknown GCP attribute '{}' at line {}", key, line_number);
                return;
            }
        };
        *target = value.to_string();
    }

    fn parse_point(line: &str) -> Result<GroundControlPointExtended, String> {
        // one field per tab, so an empty field never shifts the columns
        let tokens: Vec<&str> = line.split('\t').map(str::trim).collect();
        if let Some(field) = tokens.iter().position(|t| t.is_empty()) {
            return Err(format!("Empty value in field {}", field + 1));
        }

        if tokens.len() < 4 {
            return Err(format!("Expected at least 4 tab-separated values, found {}", tokens.len()));
        }

        let mut values = [0.0f64; 4];
        for (value, token) in values.iter_mut().zip(tokens.iter()) {
            *value = token.parse::<f64>()
                .map_err(|_| format!("Invalid coordinate value '{}'", token))?;
        }

        let enabled = tokens.get(4).map(|t| *t == ENABLED_TOKEN).unwrap_or(true);
        if tokens.len() > 5 {
            debug!("Ignoring {} extra tokens in GCP line", tokens.len() - 5);
        }

        Ok(GroundControlPointExtended::with_enabled(
            Coordinates::new(values[0], values[1]),
            Coordinates::new(values[2], values[3]),
            enabled,
        ))
    }
}
