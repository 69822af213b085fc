//! Inverse-mapping warp engine
//!
//! Every destination pixel center is taken back to source pixel/line and
//! sampled there. The destination is processed in chunks of lines and
//! progress is reported after each chunk.

use log::{debug, info};

use crate::coordinate::Coordinates;
use crate::errors::{GeorefError, GeorefResult};
use crate::raster::Dataset;
use super::resample::ResamplingMethod;
use super::suggest::SuggestedOutput;
use super::transformer::ImageTransformer;

/// Destination lines per chunk
pub const DEFAULT_CHUNK_LINES: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct WarpOptions {
    pub resampling: ResamplingMethod,
    pub chunk_lines: usize,
}

impl Default for WarpOptions {
    fn default() -> Self {
        WarpOptions { resampling: ResamplingMethod::Nearest, chunk_lines: DEFAULT_CHUNK_LINES }
    }
}

/// Warp every band of `source` onto the `output` grid
///
/// Pixels that cannot be mapped or sampled take the band nodata value,
/// or 0 when the band has none. `progress` receives the completed
/// fraction in [0, 1].
pub fn warp(
    source: &Dataset,
    transformer: &ImageTransformer,
    output: &SuggestedOutput,
    options: &WarpOptions,
    progress: &mut dyn FnMut(f64),
) -> GeorefResult<Dataset> {
    if source.band_count() == 0 {
        return Err(GeorefError::Warp("Source raster has no bands".to_string()));
    }
    if output.width == 0 || output.height == 0 {
        return Err(GeorefError::Warp("Destination grid is empty".to_string()));
    }
    info!("Warping {}x{} to {}x{} ({} resampling)",
          source.width(), source.height(), output.width, output.height, options.resampling);

    let (width, height) = (output.width, output.height);
    let mut destination = Dataset::new(width, height, 0, source.data_type());
    for band in source.bands() {
        destination.add_band(band.like(width, height, band.nodata.unwrap_or(0.0)))?;
    }

    let gt = output.geotransform;
    let chunk_lines = options.chunk_lines.max(1);
    let mut mapped = 0usize;
    let mut source_pixels = vec![None; width * chunk_lines];

    for first_line in (0..height).step_by(chunk_lines) {
        let lines = chunk_lines.min(height - first_line);

        for line in 0..lines {
            let row = (first_line + line) as f64 + 0.5;
            for col in 0..width {
                let c = col as f64 + 0.5;
                let mut point = Coordinates::new(gt[0] + c * gt[1] + row * gt[2], gt[3] + c * gt[4] + row * gt[5]);
                source_pixels[line * width + col] = transformer.world_to_pixel(&mut point).then_some(point);
            }
        }

        for (index, band) in source.bands().iter().enumerate() {
            let target = destination.band_mut(index)
                .ok_or_else(|| GeorefError::Warp(format!("Missing destination band {}", index + 1)))?;
            for line in 0..lines {
                for col in 0..width {
                    let value = source_pixels[line * width + col]
                        .and_then(|p| options.resampling.sample(band, p.x, p.y));
                    if let Some(value) = value {
                        target.set(col, first_line + line, value);
                    }
                }
            }
        }

        mapped += source_pixels[..lines * width].iter().filter(|p| p.is_some()).count();
        progress((first_line + lines) as f64 / height as f64);
    }

    destination.set_geotransform(gt);
    destination.srs_wkt = transformer.target_wkt().to_string();
    debug!("{} of {} destination pixels map into the source", mapped, width * height);
    Ok(destination)
}
