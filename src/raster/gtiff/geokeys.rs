//! GeoKey directory handling
//!
//! A spatial reference is written as model type, raster type, a citation
//! holding the full WKT and, when the reference has an EPSG code, the
//! geographic or projected type key. Reading prefers the citation WKT and
//! falls back to the catalog entry of the code.

use log::{debug, warn};

use crate::coordinate::{CoordinateSystem, CoordinateSystemFactory};
use crate::errors::{GeorefError, GeorefResult};
use super::constants::{geo_keys, tags};
use super::ifd::{Ifd, IfdEntry};

/// One GeoKey directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    /// 0 for inline values, otherwise the params tag holding the value
    pub location: u16,
    pub count: u16,
    pub value_offset: u16,
}

/// Parse the key directory of an IFD; empty when the tag is absent
pub fn parse_directory(ifd: &Ifd) -> GeorefResult<Vec<GeoKeyEntry>> {
    let entry = match ifd.get(tags::GEO_KEY_DIRECTORY) {
        Some(entry) => entry,
        None => return Ok(Vec::new()),
    };
    let values = entry.values_u64()?;
    if values.len() < 4 {
        return Err(GeorefError::Raster("Invalid GeoKey directory header".to_string()));
    }

    let key_count = values[3] as usize;
    debug!("GeoKey directory version {} with {} keys", values[0], key_count);
    let keys = values[4..]
        .chunks_exact(4)
        .take(key_count)
        .map(|k| GeoKeyEntry {
            key_id: k[0] as u16,
            location: k[1] as u16,
            count: k[2] as u16,
            value_offset: k[3] as u16,
        })
        .collect();
    Ok(keys)
}

fn short_value(keys: &[GeoKeyEntry], key_id: u16) -> Option<u16> {
    keys.iter()
        .find(|k| k.key_id == key_id && k.location == 0)
        .map(|k| k.value_offset)
}

fn ascii_value(ifd: &Ifd, keys: &[GeoKeyEntry], key_id: u16) -> Option<String> {
    let key = keys.iter().find(|k| k.key_id == key_id && k.location == tags::GEO_ASCII_PARAMS)?;
    let params = ifd.get(tags::GEO_ASCII_PARAMS)?;
    let start = key.value_offset as usize;
    let end = (start + key.count as usize).min(params.data.len());
    if start >= end {
        return None;
    }
    let text = String::from_utf8_lossy(&params.data[start..end]).into_owned();
    Some(text.trim_end_matches(['|', '\0']).to_string())
}

/// Spatial reference WKT stored in the GeoKeys, empty when there is none
pub fn read_srs(ifd: &Ifd) -> GeorefResult<String> {
    let keys = parse_directory(ifd)?;
    if keys.is_empty() {
        return Ok(String::new());
    }

    if let Some(citation) = ascii_value(ifd, &keys, geo_keys::CITATION) {
        if citation.contains('[') {
            return Ok(citation);
        }
    }

    let code = short_value(&keys, geo_keys::PROJECTED_CS_TYPE)
        .or_else(|| short_value(&keys, geo_keys::GEOGRAPHIC_TYPE));
    match code {
        Some(code) => {
            let system = CoordinateSystemFactory::from_epsg(code as u32);
            match system.wkt() {
                Some(wkt) => Ok(wkt),
                None => {
                    warn!("No WKT definition for {}, spatial reference dropped", system.description());
                    Ok(String::new())
                }
            }
        }
        None => Ok(String::new()),
    }
}

/// Write the GeoKey directory and ASCII params for `srs_wkt`
pub fn write_srs(ifd: &mut Ifd, srs_wkt: &str) {
    if srs_wkt.trim().is_empty() {
        return;
    }

    let system = CoordinateSystemFactory::from_wkt(srs_wkt);
    let geographic = system.is_geographic() || srs_wkt.trim_start().starts_with("GEOGCS");
    let citation = format!("{}|", srs_wkt);

    let mut keys = vec![
        GeoKeyEntry {
            key_id: geo_keys::MODEL_TYPE,
            location: 0,
            count: 1,
            value_offset: if geographic { geo_keys::MODEL_TYPE_GEOGRAPHIC } else { geo_keys::MODEL_TYPE_PROJECTED },
        },
        GeoKeyEntry { key_id: geo_keys::RASTER_TYPE, location: 0, count: 1, value_offset: geo_keys::RASTER_PIXEL_IS_AREA },
    ];
    if citation.len() <= u16::MAX as usize {
        keys.push(GeoKeyEntry {
            key_id: geo_keys::CITATION,
            location: tags::GEO_ASCII_PARAMS,
            count: citation.len() as u16,
            value_offset: 0,
        });
    } else {
        warn!("Spatial reference WKT too long for a GeoKey citation");
    }
    if let Some(code) = epsg_short(&system) {
        let key_id = if geographic { geo_keys::GEOGRAPHIC_TYPE } else { geo_keys::PROJECTED_CS_TYPE };
        keys.push(GeoKeyEntry { key_id, location: 0, count: 1, value_offset: code });
    }

    let mut directory = vec![1u16, 1, 0, keys.len() as u16];
    for key in &keys {
        directory.extend([key.key_id, key.location, key.count, key.value_offset]);
    }
    ifd.set(IfdEntry::shorts(tags::GEO_KEY_DIRECTORY, &directory));
    if keys.iter().any(|k| k.key_id == geo_keys::CITATION) {
        ifd.set(IfdEntry::ascii(tags::GEO_ASCII_PARAMS, &citation));
    }
}

fn epsg_short(system: &CoordinateSystem) -> Option<u16> {
    system.epsg_code().and_then(|code| u16::try_from(code).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::SrsCatalog;

    #[test]
    fn test_srs_survives_directory() {
        let wkt = SrsCatalog::lookup(3857).unwrap().wkt;
        let mut ifd = Ifd::default();
        write_srs(&mut ifd, &wkt);

        let keys = parse_directory(&ifd).unwrap();
        assert_eq!(short_value(&keys, geo_keys::MODEL_TYPE), Some(geo_keys::MODEL_TYPE_PROJECTED));
        assert_eq!(short_value(&keys, geo_keys::PROJECTED_CS_TYPE), Some(3857));
        assert_eq!(read_srs(&ifd).unwrap(), wkt);
    }

    #[test]
    fn test_code_without_citation() {
        let mut ifd = Ifd::default();
        ifd.set(IfdEntry::shorts(tags::GEO_KEY_DIRECTORY, &[1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326]));
        let wkt = read_srs(&ifd).unwrap();
        assert!(wkt.starts_with("GEOGCS[\"WGS 84\""));
    }

    #[test]
    fn test_no_directory() {
        assert_eq!(read_srs(&Ifd::default()).unwrap(), "");
        let mut ifd = Ifd::default();
        write_srs(&mut ifd, "");
        assert!(!ifd.has_tag(tags::GEO_KEY_DIRECTORY));
    }
}
