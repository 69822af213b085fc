//! PNG output and input
//!
//! PNG carries no georeferencing; only the samples of 1 to 4 Byte or
//! UInt16 bands survive.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat};
use log::{info, warn};

use crate::errors::{GeorefError, GeorefResult};
use crate::raster::{DataType, Dataset, RasterBand};

/// Write `dataset` as PNG
pub fn write<P: AsRef<Path>>(dataset: &Dataset, path: P) -> GeorefResult<()> {
    let path = path.as_ref();
    let (width, height) = (dataset.width() as u32, dataset.height() as u32);
    let bands = dataset.band_count();
    if !(1..=4).contains(&bands) {
        return Err(GeorefError::Raster(format!("PNG supports 1 to 4 bands, got {}", bands)));
    }
    if dataset.geotransform().is_some() || !dataset.gcps().is_empty() {
        warn!("PNG output drops the georeferencing of {}", path.display());
    }

    let image = match dataset.data_type() {
        DataType::Byte => {
            let samples: Vec<u8> = interleave(dataset).into_iter().map(|v| DataType::Byte.clamp(v) as u8).collect();
            match bands {
                1 => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
                2 => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageLumaA8),
                3 => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
                _ => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageRgba8),
            }
        }
        DataType::UInt16 => {
            let samples: Vec<u16> = interleave(dataset).into_iter().map(|v| DataType::UInt16.clamp(v) as u16).collect();
            match bands {
                1 => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageLuma16),
                2 => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageLumaA16),
                3 => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageRgb16),
                _ => ImageBuffer::from_raw(width, height, samples).map(DynamicImage::ImageRgba16),
            }
        }
        other => return Err(GeorefError::Raster(format!("PNG does not support {} samples", other))),
    }
    .ok_or_else(|| GeorefError::Raster("Sample buffer does not match the image size".to_string()))?;

    info!("Writing PNG {} ({}x{}, {} bands)", path.display(), width, height, bands);
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Read a PNG file
pub fn read<P: AsRef<Path>>(path: P) -> GeorefResult<Dataset> {
    let image = image::open(path.as_ref())?;
    let color = image.color();
    let channels = color.channel_count() as usize;
    let sixteen_bit = color.bytes_per_pixel() as usize == channels * 2;
    let (width, height) = (image.width() as usize, image.height() as usize);

    let (data_type, samples): (DataType, Vec<f64>) = if sixteen_bit {
        let raw = match channels {
            1 => image.into_luma16().into_raw(),
            2 => image.into_luma_alpha16().into_raw(),
            3 => image.into_rgb16().into_raw(),
            _ => image.into_rgba16().into_raw(),
        };
        (DataType::UInt16, raw.into_iter().map(f64::from).collect())
    } else {
        let raw = match channels {
            1 => image.into_luma8().into_raw(),
            2 => image.into_luma_alpha8().into_raw(),
            3 => image.into_rgb8().into_raw(),
            _ => image.into_rgba8().into_raw(),
        };
        (DataType::Byte, raw.into_iter().map(f64::from).collect())
    };

    let bands = channels.min(4);
    let mut dataset = Dataset::new(width, height, 0, data_type);
    for band in 0..bands {
        let data = samples.iter().skip(band).step_by(bands).copied().collect();
        dataset.add_band(RasterBand::from_data(width, height, data)?)?;
    }
    Ok(dataset)
}

fn interleave(dataset: &Dataset) -> Vec<f64> {
    let pixels = dataset.width() * dataset.height();
    let mut samples = Vec::with_capacity(pixels * dataset.band_count());
    for i in 0..pixels {
        for band in dataset.bands() {
            samples.push(band.data()[i]);
        }
    }
    samples
}
