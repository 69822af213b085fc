//! Spatial reference identification from WKT
//!
//! Spatial references travel through the engine as opaque WKT strings. This
//! module only looks inside them far enough to decide whether two references
//! are the same system and, for a few well-known systems, which one it is.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use log::{debug, warn};

use crate::errors::{GeorefError, GeorefResult};
use crate::utils::wkt::{WktNode, WktValue};

lazy_static! {
    // Parse the embedded catalog once
    static ref SRS_CATALOG: SrsCatalog = {
        let content = include_str!("../../srs_catalog.toml");
        SrsCatalog::from_str(content).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse SRS catalog: {}", e);
            SrsCatalog::default()
        })
    };
}

/// Identifier for common coordinate systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// WGS 84 (EPSG:4326)
    WGS84,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM Zone (EPSG:326xx for northern hemisphere, 327xx for southern)
    UTM(u8, bool),
    /// Other EPSG code
    Other(u32),
    /// Reference without a recognizable authority code
    Unknown,
}

impl CoordinateSystem {
    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            CoordinateSystem::WGS84 => Some(4326),
            CoordinateSystem::WebMercator => Some(3857),
            CoordinateSystem::UTM(zone, is_northern) => {
                if *is_northern {
                    Some(32600 + *zone as u32)
                } else {
                    Some(32700 + *zone as u32)
                }
            }
            CoordinateSystem::Other(code) => Some(*code),
            CoordinateSystem::Unknown => None,
        }
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::WGS84 => "WGS 84 (EPSG:4326)".to_string(),
            CoordinateSystem::WebMercator => "Web Mercator (EPSG:3857)".to_string(),
            CoordinateSystem::UTM(zone, is_northern) => {
                let code = self.epsg_code().unwrap_or_default();
                if *is_northern {
                    format!("UTM Zone {}N (EPSG:{})", zone, code)
                } else {
                    format!("UTM Zone {}S (EPSG:{})", zone, code)
                }
            }
            CoordinateSystem::Other(code) => format!("EPSG:{}", code),
            CoordinateSystem::Unknown => "Unknown reference".to_string(),
        }
    }

    /// True for systems whose coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self.epsg_code() {
            Some(code) => SRS_CATALOG.entries.get(&code).map(|e| e.geographic).unwrap_or(false),
            None => false,
        }
    }

    /// WKT for this system, when it is listed in the catalog
    pub fn wkt(&self) -> Option<String> {
        self.epsg_code()
            .and_then(|code| SRS_CATALOG.entries.get(&code))
            .map(|entry| entry.wkt.clone())
    }
}

/// One well-known spatial reference
#[derive(Debug, Clone)]
pub struct SrsEntry {
    /// EPSG code
    pub code: u32,
    /// Human readable name
    pub name: String,
    /// Geographic (degrees) or projected
    pub geographic: bool,
    /// WKT definition
    pub wkt: String,
}

/// Catalog of well-known spatial references
#[derive(Debug, Default)]
pub struct SrsCatalog {
    entries: BTreeMap<u32, SrsEntry>,
}

impl SrsCatalog {
    /// Parse catalog entries from a TOML string
    pub fn from_str(content: &str) -> GeorefResult<Self> {
        let toml_value: toml::Value = content.parse()?;

        let mut catalog = SrsCatalog::default();
        let list = match toml_value.get("srs").and_then(|v| v.as_array()) {
            Some(list) => list,
            None => return Ok(catalog),
        };

        for item in list {
            let code = item.get("code").and_then(|v| v.as_integer());
            let wkt = item.get("wkt").and_then(|v| v.as_str());
            match (code, wkt) {
                (Some(code), Some(wkt)) if code > 0 => {
                    let entry = SrsEntry {
                        code: code as u32,
                        name: item.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        geographic: item.get("geographic").and_then(|v| v.as_bool()).unwrap_or(false),
                        wkt: wkt.to_string(),
                    };
                    catalog.entries.insert(entry.code, entry);
                }
                _ => warn!("Skipping malformed SRS catalog entry: {:?}", item),
            }
        }

        Ok(catalog)
    }

    /// Look up an entry of the embedded catalog
    pub fn lookup(code: u32) -> Option<SrsEntry> {
        SRS_CATALOG.entries.get(&code).cloned()
    }

    /// All entries of the embedded catalog, ordered by code
    pub fn entries() -> Vec<SrsEntry> {
        SRS_CATALOG.entries.values().cloned().collect()
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    /// Create a coordinate system from an EPSG code
    pub fn from_epsg(epsg: u32) -> CoordinateSystem {
        match epsg {
            4326 => CoordinateSystem::WGS84,
            3857 | 900913 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::UTM((epsg - 32600) as u8, true),
            32701..=32760 => CoordinateSystem::UTM((epsg - 32700) as u8, false),
            _ => CoordinateSystem::Other(epsg),
        }
    }

    /// Parse a coordinate system from a string (e.g. "EPSG:4326" or "4326")
    pub fn from_string(crs_str: &str) -> GeorefResult<CoordinateSystem> {
        let crs_str = crs_str.trim().to_uppercase();
        let code_str = crs_str.strip_prefix("EPSG:").unwrap_or(&crs_str);

        code_str.parse::<u32>()
            .map(Self::from_epsg)
            .map_err(|_| GeorefError::GenericError(format!("Unsupported CRS format: {}", crs_str)))
    }

    /// Identify a coordinate system from its WKT
    ///
    /// The root `AUTHORITY["EPSG", code]` node decides. Without one, the
    /// name of the root node is compared with the catalog names.
    pub fn from_wkt(wkt: &str) -> CoordinateSystem {
        let root = match WktNode::parse(wkt) {
            Ok(root) => root,
            Err(e) => {
                debug!("Unparseable spatial reference WKT: {}", e);
                return CoordinateSystem::Unknown;
            }
        };

        if let Some(code) = authority_code(&root) {
            return Self::from_epsg(code);
        }

        if let Some(name) = root.name() {
            if let Some(entry) = SRS_CATALOG.entries.values().find(|e| e.name.eq_ignore_ascii_case(name)) {
                return Self::from_epsg(entry.code);
            }
        }

        CoordinateSystem::Unknown
    }

    /// Resolve user input (EPSG code or WKT) into a WKT string
    pub fn resolve_wkt(input: &str) -> GeorefResult<String> {
        let trimmed = input.trim();
        if trimmed.contains('[') {
            WktNode::parse(trimmed)?;
            return Ok(trimmed.to_string());
        }
        let system = Self::from_string(trimmed)?;
        system.wkt().ok_or_else(|| GeorefError::GenericError(format!(
            "No WKT definition available for {}", system.description())))
    }
}

fn authority_code(node: &WktNode) -> Option<u32> {
    let authority = node.child("AUTHORITY")?;
    match (authority.values.first(), authority.values.get(1)) {
        (Some(WktValue::Text(name)), Some(WktValue::Text(code))) if name.eq_ignore_ascii_case("EPSG") => {
            code.trim().parse().ok()
        }
        (Some(WktValue::Text(name)), Some(WktValue::Number(code))) if name.eq_ignore_ascii_case("EPSG") => {
            Some(*code as u32)
        }
        _ => None,
    }
}

/// Whether two WKT strings describe the same spatial reference
///
/// Equal after whitespace normalization, or both carry the same EPSG code.
pub fn is_same_reference(wkt_a: &str, wkt_b: &str) -> bool {
    let normalize = |s: &str| s.split_whitespace().collect::<String>();
    if normalize(wkt_a) == normalize(wkt_b) {
        return true;
    }

    let system_a = CoordinateSystemFactory::from_wkt(wkt_a);
    let system_b = CoordinateSystemFactory::from_wkt(wkt_b);
    match (system_a.epsg_code(), system_b.epsg_code()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
