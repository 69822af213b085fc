//! GeoTIFF reading
//!
//! Only the first IFD is read. Stripped images with chunky or planar
//! samples are supported; tiled images and predictors are rejected.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use log::{debug, info, warn};

use crate::compression::Compression;
use crate::coordinate::Coordinates;
use crate::errors::{GeorefError, GeorefResult};
use crate::gcp::GroundControlPoint;
use crate::raster::{ColorTable, DataType, Dataset, RasterBand};
use super::byte_order::ByteOrder;
use super::constants::{header, photometric, planar_config, sample_format, tags};
use super::geokeys;
use super::ifd::Ifd;
use super::metadata;

/// Reads GeoTIFF files into datasets
pub struct GeoTiffReader;

impl GeoTiffReader {
    /// Read a GeoTIFF file
    pub fn read<P: AsRef<Path>>(path: P) -> GeorefResult<Dataset> {
        let path = path.as_ref();
        info!("Reading GeoTIFF {}", path.display());
        let bytes = fs::read(path)?;
        Self::read_bytes(bytes)
    }

    /// Read a GeoTIFF held in memory
    pub fn read_bytes(bytes: Vec<u8>) -> GeorefResult<Dataset> {
        let mut cursor = Cursor::new(bytes);
        let order = ByteOrder::detect(&mut cursor)?;
        let version = order.read_u16(&mut cursor)?;
        let (is_big_tiff, first_ifd) = match version {
            header::TIFF_VERSION => (false, order.read_u32(&mut cursor)? as u64),
            header::BIG_TIFF_VERSION => {
                let _offset_size = order.read_u16(&mut cursor)?;
                let _reserved = order.read_u16(&mut cursor)?;
                (true, order.read_u64(&mut cursor)?)
            }
            other => return Err(GeorefError::Raster(format!("Not a TIFF file (version {})", other))),
        };
        debug!("TIFF byte order {:?}, BigTIFF: {}, first IFD at {}", order, is_big_tiff, first_ifd);

        let ifd = Ifd::read(&mut cursor, order, first_ifd, is_big_tiff)?;
        let bytes = cursor.into_inner();

        let mut dataset = read_image(&ifd, &bytes, order)?;
        read_georeferencing(&ifd, &mut dataset)?;
        read_band_properties(&ifd, &mut dataset)?;

        if let Some(entry) = ifd.get(tags::GDAL_METADATA) {
            match metadata::parse_items(&entry.text()) {
                Ok(items) => metadata::apply(&mut dataset, items),
                Err(e) => warn!("Ignoring unreadable GDAL metadata: {}", e),
            }
        }

        Ok(dataset)
    }
}

fn data_type(bits: u64, format: u64) -> GeorefResult<DataType> {
    match (bits, format as u16) {
        (8, sample_format::UNSIGNED) => Ok(DataType::Byte),
        (16, sample_format::UNSIGNED) => Ok(DataType::UInt16),
        (16, sample_format::SIGNED) => Ok(DataType::Int16),
        (32, sample_format::IEEEFP) => Ok(DataType::Float32),
        (64, sample_format::IEEEFP) => Ok(DataType::Float64),
        _ => Err(GeorefError::Raster(format!(
            "Unsupported sample type: {} bits, format {}", bits, format))),
    }
}

fn read_image(ifd: &Ifd, bytes: &[u8], order: ByteOrder) -> GeorefResult<Dataset> {
    if ifd.has_tag(tags::TILE_WIDTH) {
        return Err(GeorefError::Raster("Tiled GeoTIFF files are not supported".to_string()));
    }
    if ifd.u64_or(tags::PREDICTOR, 1)? != 1 {
        return Err(GeorefError::Raster("GeoTIFF predictors are not supported".to_string()));
    }

    let width = ifd.require_u64(tags::IMAGE_WIDTH)? as usize;
    let height = ifd.require_u64(tags::IMAGE_LENGTH)? as usize;
    let samples = ifd.u64_or(tags::SAMPLES_PER_PIXEL, 1)? as usize;
    let bits = ifd.u64_or(tags::BITS_PER_SAMPLE, 1)?;
    let format = ifd.u64_or(tags::SAMPLE_FORMAT, sample_format::UNSIGNED as u64)?;
    let data_type = data_type(bits, format)?;
    let compression = Compression::from_code(ifd.u64_or(tags::COMPRESSION, 1)?)?;
    let planar = ifd.u64_or(tags::PLANAR_CONFIGURATION, planar_config::CHUNKY as u64)? as u16;
    let rows_per_strip = (ifd.u64_or(tags::ROWS_PER_STRIP, height as u64)? as usize).clamp(1, height.max(1));

    let offsets = ifd.get(tags::STRIP_OFFSETS)
        .ok_or_else(|| GeorefError::Raster("Missing strip offsets".to_string()))?
        .values_u64()?;
    let counts = ifd.get(tags::STRIP_BYTE_COUNTS)
        .ok_or_else(|| GeorefError::Raster("Missing strip byte counts".to_string()))?
        .values_u64()?;
    if offsets.len() != counts.len() {
        return Err(GeorefError::Raster("Strip offsets and byte counts differ in length".to_string()));
    }

    info!("{}x{} image, {} bands of {}, {}", width, height, samples, data_type, compression.name());

    let strips_per_band = height.div_ceil(rows_per_strip);
    let band_strides = if planar == planar_config::PLANAR { 1 } else { samples };
    let mut planes = vec![vec![0.0f64; width * height]; samples];

    for (index, (&offset, &count)) in offsets.iter().zip(counts.iter()).enumerate() {
        let (first_band, block) = if planar == planar_config::PLANAR {
            (index / strips_per_band, index % strips_per_band)
        } else {
            (0, index)
        };
        if first_band >= samples || block >= strips_per_band {
            warn!("Ignoring extra strip {}", index);
            continue;
        }

        let start = offset as usize;
        let end = start.checked_add(count as usize).filter(|&end| end <= bytes.len())
            .ok_or_else(|| GeorefError::Raster(format!("Strip {} lies outside the file", index)))?;
        let strip = compression.decompress(&bytes[start..end])?;

        let first_row = block * rows_per_strip;
        let rows = rows_per_strip.min(height - first_row);
        let expected = rows * width * band_strides * data_type.size();
        if strip.len() < expected {
            return Err(GeorefError::Raster(format!(
                "Strip {} holds {} bytes, expected {}", index, strip.len(), expected)));
        }

        let mut reader = Cursor::new(strip);
        for row in first_row..first_row + rows {
            for col in 0..width {
                for band in 0..band_strides {
                    let value = order.read_sample(&mut reader, data_type)?;
                    planes[first_band + band][row * width + col] = value;
                }
            }
        }
    }

    let mut dataset = Dataset::new(width, height, 0, data_type);
    for plane in planes {
        dataset.add_band(RasterBand::from_data(width, height, plane)?)?;
    }
    Ok(dataset)
}

fn read_georeferencing(ifd: &Ifd, dataset: &mut Dataset) -> GeorefResult<()> {
    let srs = geokeys::read_srs(ifd)?;

    if let Some(entry) = ifd.get(tags::MODEL_TRANSFORMATION) {
        let m = entry.values_f64()?;
        if m.len() >= 16 {
            dataset.set_geotransform([m[3], m[0], m[1], m[7], m[4], m[5]]);
            dataset.srs_wkt = srs;
            return Ok(());
        }
        warn!("Ignoring short ModelTransformation tag");
    }

    let tiepoints = match ifd.get(tags::MODEL_TIEPOINT) {
        Some(entry) => entry.values_f64()?,
        None => {
            dataset.srs_wkt = srs;
            return Ok(());
        }
    };

    let scale = match ifd.get(tags::MODEL_PIXEL_SCALE) {
        Some(entry) => Some(entry.values_f64()?),
        None => None,
    };

    match scale {
        Some(scale) if tiepoints.len() == 6 && scale.len() >= 2 => {
            let (i, j, x, y) = (tiepoints[0], tiepoints[1], tiepoints[3], tiepoints[4]);
            let (sx, sy) = (scale[0], scale[1]);
            dataset.set_geotransform([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy]);
            dataset.srs_wkt = srs;
        }
        _ => {
            let gcps: Vec<GroundControlPoint> = tiepoints
                .chunks_exact(6)
                .map(|t| GroundControlPoint::new(Coordinates::new(t[0], t[1]), Coordinates::new(t[3], t[4])))
                .collect();
            debug!("Read {} tiepoints as control points", gcps.len());
            dataset.set_gcps(gcps, &srs);
        }
    }
    Ok(())
}

fn read_band_properties(ifd: &Ifd, dataset: &mut Dataset) -> GeorefResult<()> {
    if let Some(entry) = ifd.get(tags::GDAL_NODATA) {
        let text = entry.text();
        match text.trim().parse::<f64>() {
            Ok(nodata) => {
                for index in 0..dataset.band_count() {
                    if let Some(band) = dataset.band_mut(index) {
                        band.nodata = Some(nodata);
                    }
                }
            }
            Err(_) => warn!("Ignoring invalid nodata value '{}'", text),
        }
    }

    let is_palette = ifd.u64_or(tags::PHOTOMETRIC_INTERPRETATION, photometric::BLACK_IS_ZERO as u64)?
        == photometric::PALETTE as u64;
    if let (true, Some(entry)) = (is_palette, ifd.get(tags::COLOR_MAP)) {
        let values = entry.values_u64()?;
        let size = values.len() / 3;
        let entries = (0..size)
            .map(|i| [
                (values[i] >> 8) as u8,
                (values[size + i] >> 8) as u8,
                (values[2 * size + i] >> 8) as u8,
                255,
            ])
            .collect();
        if let Some(band) = dataset.band_mut(0) {
            band.color_table = Some(ColorTable { entries });
        }
    }
    Ok(())
}
