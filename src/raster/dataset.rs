//! In-memory raster dataset
//!
//! Samples are held as `f64` whatever the storage type; `DataType` only
//! decides how they are clamped and encoded when written.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::coordinate::Coordinates;
use crate::errors::{GeorefError, GeorefResult};
use crate::gcp::GroundControlPoint;
use crate::model::RasterSpatialModel;

/// Storage type of raster samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Byte,
    UInt16,
    Int16,
    Float32,
    Float64,
}

impl DataType {
    /// Size of one sample in bytes
    pub fn size(&self) -> usize {
        match self {
            DataType::Byte => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Bring a value into the representable range of the type
    pub fn clamp(&self, value: f64) -> f64 {
        match self {
            DataType::Byte => value.round().clamp(0.0, u8::MAX as f64),
            DataType::UInt16 => value.round().clamp(0.0, u16::MAX as f64),
            DataType::Int16 => value.round().clamp(i16::MIN as f64, i16::MAX as f64),
            DataType::Float32 => value as f32 as f64,
            DataType::Float64 => value,
        }
    }

    /// Type name as used in creation options
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "Byte",
            DataType::UInt16 => "UInt16",
            DataType::Int16 => "Int16",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        }
    }

    pub fn by_name(name: &str) -> GeorefResult<Self> {
        match name.to_lowercase().as_str() {
            "byte" | "uint8" => Ok(DataType::Byte),
            "uint16" => Ok(DataType::UInt16),
            "int16" => Ok(DataType::Int16),
            "float32" => Ok(DataType::Float32),
            "float64" => Ok(DataType::Float64),
            _ => Err(GeorefError::Config(format!("Unknown data type: {}", name))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Palette of RGBA entries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorTable {
    pub entries: Vec<[u8; 4]>,
}

/// One band of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    width: usize,
    height: usize,
    data: Vec<f64>,
    pub nodata: Option<f64>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub color_table: Option<ColorTable>,
    pub metadata: BTreeMap<String, String>,
}

impl RasterBand {
    /// Band filled with `fill`
    pub fn new(width: usize, height: usize, fill: f64) -> Self {
        RasterBand {
            width,
            height,
            data: vec![fill; width * height],
            nodata: None,
            scale: None,
            offset: None,
            color_table: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Band from row-major samples
    pub fn from_data(width: usize, height: usize, data: Vec<f64>) -> GeorefResult<Self> {
        if data.len() != width * height {
            return Err(GeorefError::Raster(format!(
                "Band data has {} samples, expected {}x{}", data.len(), width, height)));
        }
        let mut band = RasterBand::new(0, 0, 0.0);
        band.width = width;
        band.height = height;
        band.data = data;
        Ok(band)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Copy of the band without its samples, sized `width` × `height`
    pub fn like(&self, width: usize, height: usize, fill: f64) -> RasterBand {
        RasterBand {
            width,
            height,
            data: vec![fill; width * height],
            nodata: self.nodata,
            scale: self.scale,
            offset: self.offset,
            color_table: self.color_table.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A raster: bands, georeferencing and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    width: usize,
    height: usize,
    data_type: DataType,
    bands: Vec<RasterBand>,
    geotransform: Option<[f64; 6]>,
    /// SRS of the geotransform
    pub srs_wkt: String,
    gcps: Vec<GroundControlPoint>,
    /// SRS of the GCP destinations
    pub gcp_srs_wkt: String,
    pub metadata: BTreeMap<String, String>,
}

impl Dataset {
    /// Dataset with `band_count` zero-filled bands
    pub fn new(width: usize, height: usize, band_count: usize, data_type: DataType) -> Self {
        Dataset {
            width,
            height,
            data_type,
            bands: (0..band_count).map(|_| RasterBand::new(width, height, 0.0)).collect(),
            geotransform: None,
            srs_wkt: String::new(),
            gcps: Vec::new(),
            gcp_srs_wkt: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[RasterBand] {
        &self.bands
    }

    /// Band by 0-based index
    pub fn band(&self, index: usize) -> Option<&RasterBand> {
        self.bands.get(index)
    }

    pub fn band_mut(&mut self, index: usize) -> Option<&mut RasterBand> {
        self.bands.get_mut(index)
    }

    /// Add a band; its size must match the dataset
    pub fn add_band(&mut self, band: RasterBand) -> GeorefResult<()> {
        if band.width() != self.width || band.height() != self.height {
            return Err(GeorefError::Raster(format!(
                "Band is {}x{}, dataset is {}x{}", band.width(), band.height(), self.width, self.height)));
        }
        self.bands.push(band);
        Ok(())
    }

    /// GDAL-ordered geotransform, if the dataset is georeferenced by one
    pub fn geotransform(&self) -> Option<[f64; 6]> {
        self.geotransform
    }

    pub fn set_geotransform(&mut self, geotransform: [f64; 6]) {
        self.geotransform = Some(geotransform);
    }

    pub fn clear_geotransform(&mut self) {
        self.geotransform = None;
    }

    /// Pixel/line ↔ world model built from the geotransform
    pub fn spatial_model(&self) -> Option<RasterSpatialModel> {
        self.geotransform.and_then(RasterSpatialModel::from_geotransform)
    }

    pub fn gcps(&self) -> &[GroundControlPoint] {
        &self.gcps
    }

    /// Attach control points and the SRS of their destinations
    pub fn set_gcps(&mut self, gcps: Vec<GroundControlPoint>, srs_wkt: &str) {
        self.gcps = gcps;
        self.gcp_srs_wkt = srs_wkt.to_string();
    }

    pub fn metadata_item(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn set_metadata_item(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Copy a pixel window and a band selection into a new dataset
    ///
    /// `bands` holds 0-based indices; empty selects every band. The
    /// geotransform origin and GCP sources are shifted to the window.
    pub fn window(&self, x_off: usize, y_off: usize, width: usize, height: usize, bands: &[usize]) -> GeorefResult<Dataset> {
        if width == 0 || height == 0 || x_off + width > self.width || y_off + height > self.height {
            return Err(GeorefError::Raster(format!(
                "Window {}x{}+{}+{} is outside the {}x{} raster",
                width, height, x_off, y_off, self.width, self.height)));
        }

        let selection: Vec<usize> = if bands.is_empty() {
            (0..self.bands.len()).collect()
        } else {
            bands.to_vec()
        };

        let mut window = Dataset::new(width, height, 0, self.data_type);
        for index in selection {
            let source = self.bands.get(index)
                .ok_or_else(|| GeorefError::Raster(format!("Band {} does not exist", index + 1)))?;
            let mut band = source.like(width, height, 0.0);
            for row in 0..height {
                let start = (y_off + row) * self.width + x_off;
                band.data[row * width..(row + 1) * width].copy_from_slice(&source.data[start..start + width]);
            }
            window.bands.push(band);
        }

        if let Some(gt) = self.geotransform {
            let (x, y) = (x_off as f64, y_off as f64);
            window.geotransform = Some([
                gt[0] + x * gt[1] + y * gt[2], gt[1], gt[2],
                gt[3] + x * gt[4] + y * gt[5], gt[4], gt[5],
            ]);
        }
        window.srs_wkt = self.srs_wkt.clone();
        window.gcps = self.gcps.iter()
            .map(|gcp| {
                let source = gcp.source();
                GroundControlPoint::new(
                    Coordinates::new(source.x - x_off as f64, source.y - y_off as f64),
                    gcp.destination(),
                )
            })
            .collect();
        window.gcp_srs_wkt = self.gcp_srs_wkt.clone();
        window.metadata = self.metadata.clone();

        debug!("Windowed {}x{} raster to {}x{} at ({}, {})", self.width, self.height, width, height, x_off, y_off);
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Dataset {
        let mut dataset = Dataset::new(width, height, 2, DataType::Byte);
        for band in 0..2 {
            let data = (0..width * height).map(|i| (i + band * 100) as f64).collect();
            *dataset.band_mut(band).unwrap() = RasterBand::from_data(width, height, data).unwrap();
        }
        dataset.set_geotransform([1000.0, 10.0, 0.0, 5000.0, 0.0, -10.0]);
        dataset
    }

    #[test]
    fn test_window_shifts_origin() {
        let dataset = ramp(10, 8);
        let window = dataset.window(2, 3, 4, 2, &[1]).unwrap();
        assert_eq!(window.band_count(), 1);
        assert_eq!(window.width(), 4);
        assert_eq!(window.band(0).unwrap().get(0, 0), Some((3 * 10 + 2 + 100) as f64));
        assert_eq!(window.geotransform().unwrap(), [1020.0, 10.0, 0.0, 4970.0, 0.0, -10.0]);
    }

    #[test]
    fn test_window_rejects_out_of_range() {
        let dataset = ramp(10, 8);
        assert!(dataset.window(8, 0, 4, 2, &[]).is_err());
        assert!(dataset.window(0, 0, 4, 2, &[5]).is_err());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(DataType::Byte.clamp(300.0), 255.0);
        assert_eq!(DataType::Int16.clamp(-1.6), -2.0);
        assert_eq!(DataType::Float64.clamp(0.1), 0.1);
    }

    #[test]
    fn test_band_size_checked() {
        let mut dataset = Dataset::new(4, 4, 0, DataType::Float32);
        assert!(RasterBand::from_data(4, 4, vec![0.0; 3]).is_err());
        assert!(dataset.add_band(RasterBand::new(3, 4, 0.0)).is_err());
        assert!(dataset.add_band(RasterBand::new(4, 4, 0.0)).is_ok());
    }
}
