//! Zstandard strip codec

use log::{debug, warn};

use crate::errors::{GeorefError, GeorefResult};

/// Default compression level
pub const DEFAULT_LEVEL: i32 = 3;

pub fn decompress(data: &[u8]) -> GeorefResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    zstd::decode_all(data).map_err(|e| {
        warn!("ZSTD decompression error: {}", e);
        GeorefError::Raster(format!("ZSTD decompression error: {}", e))
    })
}

pub fn compress(data: &[u8], level: i32) -> GeorefResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let compressed = zstd::encode_all(data, level.clamp(1, 22))
        .map_err(|e| GeorefError::Raster(format!("ZSTD compression error: {}", e)))?;
    debug!("ZSTD compressed {} bytes to {}", data.len(), compressed.len());
    Ok(compressed)
}
