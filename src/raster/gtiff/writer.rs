//! GeoTIFF writing
//!
//! Files are classic little-endian TIFF laid out as header, IFD, external
//! tag data and strips, each block aligned to 4 bytes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, info};

use crate::compression::Compression;
use crate::errors::{GeorefError, GeorefResult};
use crate::raster::{DataType, Dataset};
use super::constants::{header, photometric, planar_config, sample_format, tags};
use super::geokeys;
use super::ifd::{Ifd, IfdEntry};
use super::metadata;

const HEADER_SIZE: u64 = 8;
const TARGET_STRIP_BYTES: usize = 64 * 1024;

fn align_to_4_bytes(offset: u64) -> u64 {
    (offset + 3) & !3
}

/// Writes datasets as GeoTIFF
#[derive(Debug, Clone, Default)]
pub struct GeoTiffWriter {
    pub compression: Compression,
    /// Rows per strip, sized to about 64 KiB when `None`
    pub rows_per_strip: Option<usize>,
}

impl GeoTiffWriter {
    pub fn new(compression: Compression) -> Self {
        GeoTiffWriter { compression, rows_per_strip: None }
    }

    /// Write `dataset` to `path`
    pub fn write<P: AsRef<Path>>(&self, dataset: &Dataset, path: P) -> GeorefResult<()> {
        let path = path.as_ref();
        info!("Writing GeoTIFF {} ({}x{}, {} bands, {})",
              path.display(), dataset.width(), dataset.height(), dataset.band_count(), self.compression.name());

        if dataset.band_count() == 0 || dataset.width() == 0 || dataset.height() == 0 {
            return Err(GeorefError::Raster("Cannot write an empty raster".to_string()));
        }

        let strips = self.encode_strips(dataset)?;
        let mut ifd = self.build_ifd(dataset, &strips)?;

        // Layout: IFD, then external values in tag order, then strips
        let entry_count = ifd.entries.len() as u64;
        let ifd_size = 2 + entry_count * 12 + 4;
        let mut offset = align_to_4_bytes(HEADER_SIZE + ifd_size);
        for entry in ifd.sorted_entries() {
            if !entry.is_inline(false) {
                offset = align_to_4_bytes(offset + entry.value_size() as u64);
            }
        }
        let mut strip_offsets = Vec::with_capacity(strips.len());
        for strip in &strips {
            strip_offsets.push(to_u32(offset)?);
            offset = align_to_4_bytes(offset + strip.len() as u64);
        }
        to_u32(offset)?;
        ifd.set(IfdEntry::longs(tags::STRIP_OFFSETS, &strip_offsets));

        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        write_header(&mut writer)?;
        let mut position = HEADER_SIZE;

        let entries = ifd.sorted_entries();
        let mut external_offset = align_to_4_bytes(HEADER_SIZE + ifd_size);
        writer.write_u16::<LittleEndian>(entries.len() as u16)?;
        for entry in &entries {
            writer.write_u16::<LittleEndian>(entry.tag)?;
            writer.write_u16::<LittleEndian>(entry.field_type)?;
            writer.write_u32::<LittleEndian>(to_u32(entry.count)?)?;
            if entry.is_inline(false) {
                let mut value = entry.data.clone();
                value.resize(4, 0);
                writer.write_all(&value)?;
            } else {
                writer.write_u32::<LittleEndian>(to_u32(external_offset)?)?;
                external_offset = align_to_4_bytes(external_offset + entry.value_size() as u64);
            }
        }
        writer.write_u32::<LittleEndian>(0)?;
        position += ifd_size;

        for entry in entries.iter().filter(|e| !e.is_inline(false)) {
            position = pad_to(&mut writer, position, align_to_4_bytes(position))?;
            writer.write_all(&entry.data)?;
            position += entry.data.len() as u64;
        }

        for (strip, &strip_offset) in strips.iter().zip(strip_offsets.iter()) {
            position = pad_to(&mut writer, position, strip_offset as u64)?;
            writer.write_all(strip)?;
            position += strip.len() as u64;
        }

        writer.flush()?;
        debug!("Wrote {} bytes in {} strips", position, strips.len());
        Ok(())
    }

    fn strip_rows(&self, dataset: &Dataset) -> usize {
        let row_bytes = dataset.width() * dataset.band_count() * dataset.data_type().size();
        self.rows_per_strip
            .unwrap_or_else(|| (TARGET_STRIP_BYTES / row_bytes.max(1)).max(1))
            .clamp(1, dataset.height())
    }

    /// Chunky strips, compressed
    fn encode_strips(&self, dataset: &Dataset) -> GeorefResult<Vec<Vec<u8>>> {
        let rows_per_strip = self.strip_rows(dataset);
        let data_type = dataset.data_type();
        let width = dataset.width();
        let mut strips = Vec::new();

        for first_row in (0..dataset.height()).step_by(rows_per_strip) {
            let rows = rows_per_strip.min(dataset.height() - first_row);
            let mut raw = Vec::with_capacity(rows * width * dataset.band_count() * data_type.size());
            for row in first_row..first_row + rows {
                for col in 0..width {
                    for band in dataset.bands() {
                        write_sample(&mut raw, data_type, band.data()[row * width + col])?;
                    }
                }
            }
            strips.push(self.compression.compress(&raw)?);
        }
        Ok(strips)
    }

    fn build_ifd(&self, dataset: &Dataset, strips: &[Vec<u8>]) -> GeorefResult<Ifd> {
        let bands = dataset.band_count();
        let data_type = dataset.data_type();
        let first = dataset.band(0);
        let color_table = first.and_then(|b| b.color_table.as_ref())
            .filter(|_| bands == 1 && data_type == DataType::Byte);

        let photometric = if color_table.is_some() {
            photometric::PALETTE
        } else if bands >= 3 && !data_type.is_float() {
            photometric::RGB
        } else {
            photometric::BLACK_IS_ZERO
        };
        let color_samples = if photometric == photometric::RGB { 3 } else { 1 };

        let bits = (data_type.size() * 8) as u16;
        let format = match data_type {
            DataType::Int16 => sample_format::SIGNED,
            DataType::Float32 | DataType::Float64 => sample_format::IEEEFP,
            _ => sample_format::UNSIGNED,
        };

        let mut ifd = Ifd::default();
        ifd.set(IfdEntry::longs(tags::IMAGE_WIDTH, &[to_u32(dataset.width() as u64)?]));
        ifd.set(IfdEntry::longs(tags::IMAGE_LENGTH, &[to_u32(dataset.height() as u64)?]));
        ifd.set(IfdEntry::shorts(tags::BITS_PER_SAMPLE, &vec![bits; bands]));
        ifd.set(IfdEntry::shorts(tags::COMPRESSION, &[self.compression.code()]));
        ifd.set(IfdEntry::shorts(tags::PHOTOMETRIC_INTERPRETATION, &[photometric]));
        // Placeholder, replaced once the layout is known
        ifd.set(IfdEntry::longs(tags::STRIP_OFFSETS, &vec![0; strips.len()]));
        ifd.set(IfdEntry::shorts(tags::SAMPLES_PER_PIXEL, &[bands as u16]));
        ifd.set(IfdEntry::longs(tags::ROWS_PER_STRIP, &[self.strip_rows(dataset) as u32]));
        let counts = strips.iter().map(|s| to_u32(s.len() as u64)).collect::<GeorefResult<Vec<u32>>>()?;
        ifd.set(IfdEntry::longs(tags::STRIP_BYTE_COUNTS, &counts));
        ifd.set(IfdEntry::shorts(tags::PLANAR_CONFIGURATION, &[planar_config::CHUNKY]));
        ifd.set(IfdEntry::shorts(tags::SAMPLE_FORMAT, &vec![format; bands]));

        if bands > color_samples {
            // Fourth band of RGB is alpha, everything else unspecified
            let extra: Vec<u16> = (color_samples..bands)
                .map(|b| if photometric == photometric::RGB && b == 3 { 2 } else { 0 })
                .collect();
            ifd.set(IfdEntry::shorts(tags::EXTRA_SAMPLES, &extra));
        }

        if let Some(table) = color_table {
            let mut map = vec![0u16; 3 * 256];
            for (i, entry) in table.entries.iter().take(256).enumerate() {
                map[i] = entry[0] as u16 * 257;
                map[256 + i] = entry[1] as u16 * 257;
                map[512 + i] = entry[2] as u16 * 257;
            }
            ifd.set(IfdEntry::shorts(tags::COLOR_MAP, &map));
        }

        if let Some(gt) = dataset.geotransform() {
            if gt[2] == 0.0 && gt[4] == 0.0 {
                ifd.set(IfdEntry::doubles(tags::MODEL_PIXEL_SCALE, &[gt[1], -gt[5], 0.0]));
                ifd.set(IfdEntry::doubles(tags::MODEL_TIEPOINT, &[0.0, 0.0, 0.0, gt[0], gt[3], 0.0]));
            } else {
                ifd.set(IfdEntry::doubles(tags::MODEL_TRANSFORMATION, &[
                    gt[1], gt[2], 0.0, gt[0],
                    gt[4], gt[5], 0.0, gt[3],
                    0.0, 0.0, 0.0, 0.0,
                    0.0, 0.0, 0.0, 1.0,
                ]));
            }
            geokeys::write_srs(&mut ifd, &dataset.srs_wkt);
        } else if !dataset.gcps().is_empty() {
            let tiepoints: Vec<f64> = dataset.gcps().iter()
                .flat_map(|gcp| {
                    let (s, d) = (gcp.source(), gcp.destination());
                    [s.x, s.y, 0.0, d.x, d.y, 0.0]
                })
                .collect();
            ifd.set(IfdEntry::doubles(tags::MODEL_TIEPOINT, &tiepoints));
            geokeys::write_srs(&mut ifd, &dataset.gcp_srs_wkt);
        }

        if let Some(nodata) = first.and_then(|b| b.nodata) {
            ifd.set(IfdEntry::ascii(tags::GDAL_NODATA, &nodata.to_string()));
        }
        if let Some(xml) = metadata::to_xml(dataset)? {
            ifd.set(IfdEntry::ascii(tags::GDAL_METADATA, &xml));
        }

        Ok(ifd)
    }
}

fn write_header(writer: &mut impl Write) -> GeorefResult<()> {
    writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;
    writer.write_u16::<LittleEndian>(header::TIFF_VERSION)?;
    writer.write_u32::<LittleEndian>(HEADER_SIZE as u32)?;
    Ok(())
}

fn write_sample(out: &mut Vec<u8>, data_type: DataType, value: f64) -> GeorefResult<()> {
    let value = data_type.clamp(value);
    match data_type {
        DataType::Byte => out.write_u8(value as u8)?,
        DataType::UInt16 => out.write_u16::<LittleEndian>(value as u16)?,
        DataType::Int16 => out.write_i16::<LittleEndian>(value as i16)?,
        DataType::Float32 => out.write_f32::<LittleEndian>(value as f32)?,
        DataType::Float64 => out.write_f64::<LittleEndian>(value)?,
    }
    Ok(())
}

fn pad_to(writer: &mut impl Write, position: u64, target: u64) -> GeorefResult<u64> {
    if target > position {
        writer.write_all(&vec![0u8; (target - position) as usize])?;
    }
    Ok(target.max(position))
}

fn to_u32(value: u64) -> GeorefResult<u32> {
    u32::try_from(value)
        .map_err(|_| GeorefError::Raster(format!("Offset {} exceeds the classic TIFF limit", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{Coordinates, SrsCatalog};
    use crate::gcp::GroundControlPoint;
    use crate::raster::gtiff::GeoTiffReader;
    use crate::raster::{ColorTable, RasterBand};
    use tempfile::tempdir;

    fn sample(data_type: DataType, bands: usize) -> Dataset {
        let mut dataset = Dataset::new(7, 5, 0, data_type);
        for b in 0..bands {
            let data = (0..35).map(|i| (i * (b + 1)) as f64).collect();
            dataset.add_band(RasterBand::from_data(7, 5, data).unwrap()).unwrap();
        }
        dataset
    }

    #[test]
    fn test_write_read_rgb_deflate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rgb.tif");
        let mut dataset = sample(DataType::Byte, 3);
        dataset.set_geotransform([500000.0, 30.0, 0.0, 4000000.0, 0.0, -30.0]);
        dataset.srs_wkt = SrsCatalog::lookup(3857).unwrap().wkt;
        dataset.set_metadata_item("PROCESS_HISTORY", "<History/>");

        let writer = GeoTiffWriter { compression: Compression::Deflate, rows_per_strip: Some(2) };
        writer.write(&dataset, &path).unwrap();
        let read = GeoTiffReader::read(&path).unwrap();

        assert_eq!(read.bands(), dataset.bands());
        assert_eq!(read.geotransform(), dataset.geotransform());
        assert_eq!(read.srs_wkt, dataset.srs_wkt);
        assert_eq!(read.metadata_item("PROCESS_HISTORY"), Some("<History/>"));
    }

    #[test]
    fn test_rotated_float_with_nodata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.tif");
        let mut dataset = sample(DataType::Float32, 2);
        dataset.band_mut(0).unwrap().nodata = Some(-9999.0);
        dataset.band_mut(1).unwrap().nodata = Some(-9999.0);
        dataset.set_geotransform([10.0, 1.0, 0.5, 20.0, 0.25, -1.0]);

        GeoTiffWriter::new(Compression::Zstd(3)).write(&dataset, &path).unwrap();
        let read = GeoTiffReader::read(&path).unwrap();
        assert_eq!(read.data_type(), DataType::Float32);
        assert_eq!(read.geotransform(), Some([10.0, 1.0, 0.5, 20.0, 0.25, -1.0]));
        assert_eq!(read.band(1).unwrap().nodata, Some(-9999.0));
        assert_eq!(read.band(1).unwrap().data(), dataset.band(1).unwrap().data());
    }

    #[test]
    fn test_gcps_and_palette() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gcps.tif");
        let mut dataset = sample(DataType::Byte, 1);
        dataset.band_mut(0).unwrap().color_table = Some(ColorTable {
            entries: vec![[0, 0, 0, 255], [255, 128, 0, 255]],
        });
        let gcps = vec![
            GroundControlPoint::new(Coordinates::new(0.0, 0.0), Coordinates::new(-3.7, 40.4)),
            GroundControlPoint::new(Coordinates::new(6.0, 0.0), Coordinates::new(-3.6, 40.4)),
            GroundControlPoint::new(Coordinates::new(0.0, 4.0), Coordinates::new(-3.7, 40.3)),
        ];
        dataset.set_gcps(gcps.clone(), &SrsCatalog::lookup(4326).unwrap().wkt);

        GeoTiffWriter::default().write(&dataset, &path).unwrap();
        let read = GeoTiffReader::read(&path).unwrap();
        assert_eq!(read.geotransform(), None);
        assert_eq!(read.gcps(), gcps.as_slice());
        assert_eq!(read.gcp_srs_wkt, dataset.gcp_srs_wkt);
        let table = read.band(0).unwrap().color_table.clone().unwrap();
        assert_eq!(table.entries.len(), 256);
        assert_eq!(table.entries[1], [255, 128, 0, 255]);
    }

    #[test]
    fn test_empty_raster_rejected() {
        let dir = tempdir().unwrap();
        let dataset = Dataset::new(4, 4, 0, DataType::Byte);
        assert!(GeoTiffWriter::default().write(&dataset, dir.path().join("x.tif")).is_err());
    }
}
