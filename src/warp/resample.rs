//! Resampling kernels
//!
//! Source coordinates follow the corner convention: pixel (0,0) covers
//! [0,1) × [0,1) and its center is at (0.5, 0.5).

use std::fmt;

use crate::errors::{GeorefError, GeorefResult};
use crate::raster::RasterBand;

/// Available resampling methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResamplingMethod {
    #[default]
    Nearest,
    Bilinear,
}

impl ResamplingMethod {
    pub fn from_name(name: &str) -> GeorefResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "nearest" | "near" => Ok(ResamplingMethod::Nearest),
            "bilinear" => Ok(ResamplingMethod::Bilinear),
            _ => Err(GeorefError::Config(format!("Unknown resampling method: {}", name))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResamplingMethod::Nearest => "nearest",
            ResamplingMethod::Bilinear => "bilinear",
        }
    }

    /// Sample `band` at source pixel coordinates
    pub fn sample(&self, band: &RasterBand, x: f64, y: f64) -> Option<f64> {
        match self {
            ResamplingMethod::Nearest => nearest(band, x, y),
            ResamplingMethod::Bilinear => bilinear(band, x, y),
        }
    }
}

impl fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn is_valid(band: &RasterBand, value: f64) -> bool {
    !value.is_nan() && band.nodata != Some(value)
}

/// Value of the pixel containing (x, y)
pub fn nearest(band: &RasterBand, x: f64, y: f64) -> Option<f64> {
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return None;
    }
    let value = band.get(x.floor() as usize, y.floor() as usize)?;
    is_valid(band, value).then_some(value)
}

/// 2×2 weighted interpolation between pixel centers
///
/// `None` when a neighbour is outside the band or holds nodata.
pub fn bilinear(band: &RasterBand, x: f64, y: f64) -> Option<f64> {
    let cx = x - 0.5;
    let cy = y - 0.5;
    if !cx.is_finite() || !cy.is_finite() || cx < 0.0 || cy < 0.0 {
        return None;
    }

    let (x0, y0) = (cx.floor() as usize, cy.floor() as usize);
    let v00 = band.get(x0, y0)?;
    let v10 = band.get(x0 + 1, y0)?;
    let v01 = band.get(x0, y0 + 1)?;
    let v11 = band.get(x0 + 1, y0 + 1)?;
    if ![v00, v10, v01, v11].iter().all(|&v| is_valid(band, v)) {
        return None;
    }

    let dx = cx - x0 as f64;
    let dy = cy - y0 as f64;
    Some(v00 * (1.0 - dx) * (1.0 - dy) + v10 * dx * (1.0 - dy) + v01 * (1.0 - dx) * dy + v11 * dx * dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> RasterBand {
        RasterBand::from_data(3, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap()
    }

    #[test]
    fn test_nearest() {
        let band = grid();
        assert_eq!(nearest(&band, 0.5, 0.5), Some(1.0));
        assert_eq!(nearest(&band, 2.99, 1.0), Some(6.0));
        assert_eq!(nearest(&band, -0.1, 0.5), None);
        assert_eq!(nearest(&band, 3.0, 0.5), None);
    }

    #[test]
    fn test_bilinear() {
        let band = grid();
        assert_relative_eq!(bilinear(&band, 1.5, 1.5).unwrap(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(bilinear(&band, 1.0, 0.5).unwrap(), 1.5, epsilon = 1e-12);
        assert!(bilinear(&band, 0.2, 0.5).is_none());
        assert!(bilinear(&band, 2.7, 1.0).is_none());
    }

    #[test]
    fn test_nodata_skipped() {
        let mut band = grid();
        band.nodata = Some(5.0);
        assert_eq!(nearest(&band, 1.5, 1.5), None);
        assert!(bilinear(&band, 1.0, 1.0).is_none());
        assert_eq!(ResamplingMethod::from_name("BILINEAR").unwrap(), ResamplingMethod::Bilinear);
        assert!(ResamplingMethod::from_name("cubic").is_err());
    }
}
