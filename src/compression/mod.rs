//! Strip compression for the GeoTIFF driver

mod deflate;
mod zstd;

use crate::errors::{GeorefError, GeorefResult};

/// Compression method of GeoTIFF strips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Code 1
    #[default]
    None,
    /// Adobe Deflate, code 8 (32946 is accepted on read)
    Deflate,
    /// Zstandard, code 14
    Zstd(i32),
}

impl Compression {
    /// Compression for a TIFF compression code
    pub fn from_code(code: u64) -> GeorefResult<Self> {
        match code {
            1 => Ok(Compression::None),
            8 | 32946 => Ok(Compression::Deflate),
            14 => Ok(Compression::Zstd(zstd::DEFAULT_LEVEL)),
            _ => Err(GeorefError::Raster(format!("Unsupported compression method: {}", code))),
        }
    }

    /// Compression by name, as given in creation options
    pub fn by_name(name: &str) -> GeorefResult<Self> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Compression::None),
            "deflate" | "zip" | "adobe deflate" => Ok(Compression::Deflate),
            "zstd" => Ok(Compression::Zstd(zstd::DEFAULT_LEVEL)),
            _ => Err(GeorefError::Config(format!("Unknown compression type: {}", name))),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Compression::None => 1,
            Compression::Deflate => 8,
            Compression::Zstd(_) => 14,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "Uncompressed",
            Compression::Deflate => "Adobe Deflate",
            Compression::Zstd(_) => "ZSTD",
        }
    }

    pub fn compress(&self, data: &[u8]) -> GeorefResult<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Deflate => deflate::compress(data),
            Compression::Zstd(level) => zstd::compress(data, *level),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> GeorefResult<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Deflate => deflate::decompress(data),
            Compression::Zstd(_) => zstd::decompress(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_names() {
        assert_eq!(Compression::from_code(8).unwrap(), Compression::Deflate);
        assert_eq!(Compression::from_code(32946).unwrap().code(), 8);
        assert!(Compression::from_code(5).is_err());
        assert_eq!(Compression::by_name("ZIP").unwrap(), Compression::Deflate);
        assert!(Compression::by_name("lzw").is_err());
    }

    #[test]
    fn test_codecs_restore_data() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        for compression in [Compression::None, Compression::Deflate, Compression::Zstd(3)] {
            let packed = compression.compress(&data).unwrap();
            assert_eq!(compression.decompress(&packed).unwrap(), data, "{}", compression.name());
        }
    }
}
