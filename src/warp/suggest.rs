//! Suggested output extent and pixel size of a warp
//!
//! Points along the source border are taken to the destination system.
//! When some of them fail to transform, an interior grid is sampled too.
//! Where transformed X changes sign between neighbouring samples, or a
//! sample fails next to one that succeeds, the pixel interval is bisected
//! so the extent follows the last valid position instead of the coarse
//! sample.

use log::{debug, info, warn};

use crate::coordinate::Coordinates;
use crate::errors::{GeorefError, GeorefResult};
use super::transformer::ImageTransformer;

/// Samples per border edge
const EDGE_STEPS: usize = 20;
/// Bisection iterations between two samples
const BISECTION_STEPS: usize = 10;
/// Relative growths tried on the right and bottom edges
pub const RETRY_RATIOS: [f64; 5] = [0.0, 0.001, 0.01, 0.1, 1.0];

/// Destination grid proposed for a warp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestedOutput {
    pub geotransform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

impl SuggestedOutput {
    /// Extent as (min_x, min_y, max_x, max_y)
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let gt = &self.geotransform;
        let max_x = gt[0] + self.width as f64 * gt[1];
        let min_y = gt[3] + self.height as f64 * gt[5];
        (gt[0], min_y, max_x, gt[3])
    }

    /// Keep the extent and change the pixel/line counts
    pub fn with_size(&self, width: usize, height: usize) -> SuggestedOutput {
        let (min_x, min_y, max_x, max_y) = self.extent();
        let (width, height) = (width.max(1), height.max(1));
        SuggestedOutput {
            geotransform: [min_x, (max_x - min_x) / width as f64, 0.0, max_y, 0.0, -(max_y - min_y) / height as f64],
            width,
            height,
        }
    }

    /// Keep the extent and change the pixel size; counts are recomputed
    pub fn with_pixel_size(&self, pixel_width: f64, pixel_height: f64) -> SuggestedOutput {
        let (min_x, min_y, max_x, max_y) = self.extent();
        let pixel_width = pixel_width.abs();
        let pixel_height = pixel_height.abs();
        SuggestedOutput {
            geotransform: [min_x, pixel_width, 0.0, max_y, 0.0, -pixel_height],
            width: covering_count(max_x - min_x, pixel_width),
            height: covering_count(max_y - min_y, pixel_height),
        }
    }
}

/// Smallest count of `size` cells that leaves no sliver of `extent` out
///
/// The rounded count is grown by each of `RETRY_RATIOS` in turn until the
/// cells cover the extent.
pub fn covering_count(extent: f64, size: f64) -> usize {
    if !(size > 0.0) || !extent.is_finite() {
        return 1;
    }
    let exact = extent / size;
    let tolerance = 1e-9 * exact.max(1.0);
    let mut count = 1;
    for ratio in RETRY_RATIOS {
        count = ((exact * (1.0 + ratio)) + 0.5).floor().max(1.0) as usize;
        if count as f64 + tolerance >= exact {
            if ratio > 0.0 {
                debug!("Grew {:.3} cells to {} (ratio {})", exact, count, ratio);
            }
            return count;
        }
    }
    count
}

fn transformed(transformer: &ImageTransformer, pixel: Coordinates) -> Option<Coordinates> {
    let mut point = pixel;
    transformer.pixel_to_world(&mut point).then_some(point)
}

/// Bisect between a valid and an invalid pixel position
fn last_valid(transformer: &ImageTransformer, valid: Coordinates, invalid: Coordinates) -> Option<Coordinates> {
    let (mut good, mut bad) = (valid, invalid);
    let mut result = transformed(transformer, good)?;
    for _ in 0..BISECTION_STEPS {
        let middle = Coordinates::new((good.x + bad.x) / 2.0, (good.y + bad.y) / 2.0);
        match transformed(transformer, middle) {
            Some(point) => {
                good = middle;
                result = point;
            }
            None => bad = middle,
        }
    }
    Some(result)
}

/// Bisect towards the sign change of transformed X between two pixels
fn around_sign_change(transformer: &ImageTransformer, a: Coordinates, b: Coordinates) -> Vec<Coordinates> {
    let (mut left, mut right) = (a, b);
    let (mut left_world, mut right_world) = match (transformed(transformer, a), transformed(transformer, b)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Vec::new(),
    };
    for _ in 0..BISECTION_STEPS {
        let middle = Coordinates::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0);
        let world = match transformed(transformer, middle) {
            Some(world) => world,
            None => break,
        };
        if world.x.signum() == left_world.x.signum() {
            left = middle;
            left_world = world;
        } else {
            right = middle;
            right_world = world;
        }
    }
    vec![left_world, right_world]
}

/// Pixel positions along the border of a `width` × `height` raster, in order
fn border_pixels(width: f64, height: f64) -> Vec<Coordinates> {
    let mut pixels = Vec::with_capacity(EDGE_STEPS * 4);
    for i in 0..EDGE_STEPS {
        pixels.push(Coordinates::new(width * i as f64 / EDGE_STEPS as f64, 0.0));
    }
    for i in 0..EDGE_STEPS {
        pixels.push(Coordinates::new(width, height * i as f64 / EDGE_STEPS as f64));
    }
    for i in 0..EDGE_STEPS {
        pixels.push(Coordinates::new(width * (EDGE_STEPS - i) as f64 / EDGE_STEPS as f64, height));
    }
    for i in 0..EDGE_STEPS {
        pixels.push(Coordinates::new(0.0, height * (EDGE_STEPS - i) as f64 / EDGE_STEPS as f64));
    }
    pixels
}

/// Walk a closed sequence of pixel positions, collecting transformed points
///
/// Returns the points and the number of positions that failed.
fn sample_path(transformer: &ImageTransformer, pixels: &[Coordinates], closed: bool) -> (Vec<Coordinates>, usize) {
    let results: Vec<Option<Coordinates>> = pixels.iter().map(|p| transformed(transformer, *p)).collect();
    let failures = results.iter().filter(|r| r.is_none()).count();
    let mut points: Vec<Coordinates> = results.iter().flatten().copied().collect();

    let pairs = if closed { pixels.len() } else { pixels.len().saturating_sub(1) };
    for i in 0..pairs {
        let j = (i + 1) % pixels.len();
        match (results[i], results[j]) {
            (Some(a), Some(b)) if a.x.signum() != b.x.signum() && a.x != 0.0 && b.x != 0.0 => {
                points.extend(around_sign_change(transformer, pixels[i], pixels[j]));
            }
            (Some(_), None) => points.extend(last_valid(transformer, pixels[i], pixels[j])),
            (None, Some(_)) => points.extend(last_valid(transformer, pixels[j], pixels[i])),
            _ => {}
        }
    }
    (points, failures)
}

fn interior_pixels(width: f64, height: f64) -> Vec<Vec<Coordinates>> {
    (0..=EDGE_STEPS)
        .map(|row| {
            let y = height * row as f64 / EDGE_STEPS as f64;
            (0..=EDGE_STEPS).map(|col| Coordinates::new(width * col as f64 / EDGE_STEPS as f64, y)).collect()
        })
        .collect()
}

/// Suggest the destination grid for warping a `width` × `height` source
pub fn suggest_output(transformer: &ImageTransformer, width: usize, height: usize) -> GeorefResult<SuggestedOutput> {
    if width == 0 || height == 0 {
        return Err(GeorefError::Warp("Source raster is empty".to_string()));
    }
    let (w, h) = (width as f64, height as f64);

    let (mut points, failures) = sample_path(transformer, &border_pixels(w, h), true);
    if failures > 0 {
        warn!("{} border samples failed to transform, sampling the interior", failures);
        for row in interior_pixels(w, h) {
            let (row_points, _) = sample_path(transformer, &row, false);
            points.extend(row_points);
        }
    }
    if points.is_empty() {
        return Err(GeorefError::Warp("No source position could be transformed".to_string()));
    }

    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    // Diagonal of the transformed corners over the diagonal pixel count
    let diagonal = match (transformed(transformer, Coordinates::new(0.0, 0.0)), transformed(transformer, Coordinates::new(w, h))) {
        (Some(ul), Some(lr)) if ul.distance_to(&lr) > 0.0 => ul.distance_to(&lr),
        _ => (max_x - min_x).hypot(max_y - min_y),
    };
    let pixel_size = diagonal / (w * w + h * h).sqrt();
    if !(pixel_size > 0.0) || !pixel_size.is_finite() {
        return Err(GeorefError::Warp(format!("Degenerate suggested pixel size {}", pixel_size)));
    }

    let output = SuggestedOutput {
        geotransform: [min_x, pixel_size, 0.0, max_y, 0.0, -pixel_size],
        width: covering_count(max_x - min_x, pixel_size),
        height: covering_count(max_y - min_y, pixel_size),
    };
    info!("Suggested output {}x{} with pixel size {} from ({}, {}) to ({}, {})",
          output.width, output.height, pixel_size, min_x, min_y, max_x, max_y);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::SrsCatalog;
    use crate::model::RasterSpatialModel;
    use crate::raster::{DataType, Dataset};
    use crate::transformation::ExactCoordinatesTransformation;
    use crate::warp::transformer::PixelGeoreference;
    use approx::assert_relative_eq;

    fn north_up(gt: [f64; 6], width: usize, height: usize) -> SuggestedOutput {
        let mut dataset = Dataset::new(width, height, 1, DataType::Byte);
        dataset.set_geotransform(gt);
        let transformer = ImageTransformer::for_dataset(&dataset, "", 1).unwrap();
        suggest_output(&transformer, width, height).unwrap()
    }

    #[test]
    fn test_identity_keeps_grid() {
        let output = north_up([500.0, 10.0, 0.0, 1000.0, 0.0, -10.0], 30, 20);
        assert_eq!((output.width, output.height), (30, 20));
        assert_relative_eq!(output.geotransform[0], 500.0);
        assert_relative_eq!(output.geotransform[3], 1000.0);
        assert_relative_eq!(output.geotransform[1], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotated_source_grows() {
        let output = north_up([0.0, 1.0, 1.0, 0.0, 1.0, -1.0], 10, 10);
        // Rotated 45°: pixel size sqrt(2), extent 20 wide
        assert_relative_eq!(output.geotransform[1], 2f64.sqrt(), epsilon = 1e-9);
        assert!(output.width as f64 * output.geotransform[1] >= 20.0 - 1e-9);
    }

    #[test]
    fn test_mercator_crossing_zero() {
        let model = RasterSpatialModel::from_geotransform([-10.0, 1.0, 0.0, 10.0, 0.0, -1.0]).unwrap();
        let exact = ExactCoordinatesTransformation::new(
            &SrsCatalog::lookup(4326).unwrap().wkt, &SrsCatalog::lookup(3857).unwrap().wkt).unwrap();
        let transformer = ImageTransformer::new(PixelGeoreference::Affine(model), exact);
        let output = suggest_output(&transformer, 20, 20).unwrap();
        let (min_x, _, max_x, max_y) = output.extent();
        assert!(min_x < -1_100_000.0 && max_x > 1_100_000.0);
        assert!(max_y > 1_110_000.0);
    }

    // Degrees per pixel so large that Mercator X overflows past pixel 16.15
    fn overflowing_transformer() -> ImageTransformer {
        let model = RasterSpatialModel::from_geotransform([0.0, 1e302, 0.0, 0.0, 0.0, -1.0]).unwrap();
        let exact = ExactCoordinatesTransformation::new(
            &SrsCatalog::lookup(4326).unwrap().wkt, &SrsCatalog::lookup(3857).unwrap().wkt).unwrap();
        ImageTransformer::new(PixelGeoreference::Affine(model), exact)
    }

    #[test]
    fn test_last_valid_bisects_to_the_boundary() {
        let transformer = overflowing_transformer();
        let valid = transformed(&transformer, Coordinates::new(16.0, 0.0)).unwrap();
        assert!(transformed(&transformer, Coordinates::new(17.0, 0.0)).is_none());

        let edge = last_valid(&transformer, Coordinates::new(16.0, 0.0), Coordinates::new(17.0, 0.0)).unwrap();
        assert!(edge.is_finite());
        assert!(edge.x > valid.x);
        assert!(last_valid(&transformer, Coordinates::new(17.0, 0.0), Coordinates::new(18.0, 0.0)).is_none());
    }

    #[test]
    fn test_failed_border_samples() {
        let transformer = overflowing_transformer();
        let (points, failures) = sample_path(&transformer, &border_pixels(20.0, 10.0), true);
        // x = 17..20 fail on the top, right and bottom edges
        assert_eq!(failures, 3 + EDGE_STEPS + 4);
        assert!(points.iter().all(|p| p.is_finite()));
        let valid = transformed(&transformer, Coordinates::new(16.0, 0.0)).unwrap();
        assert!(points.iter().any(|p| p.x > valid.x));

        let rows = interior_pixels(20.0, 10.0);
        assert_eq!(rows.len(), EDGE_STEPS + 1);
        let (row_points, row_failures) = sample_path(&transformer, &rows[EDGE_STEPS / 2], false);
        assert_eq!(row_failures, 4);
        assert_eq!(row_points.len(), EDGE_STEPS + 1 - 4 + 1);
    }

    #[test]
    fn test_suggestion_from_partial_border() {
        let transformer = overflowing_transformer();
        let output = suggest_output(&transformer, 20, 10).unwrap();
        let gt = output.geotransform;
        assert_eq!(gt[0], 0.0);
        assert!(gt[3].abs() < 1e-6);
        assert!(gt[1].is_finite() && gt[1] > 0.0);
        assert!(output.width >= 1 && output.height >= 1);
    }

    #[test]
    fn test_covering_count() {
        assert_eq!(covering_count(100.0, 10.0), 10);
        assert_eq!(covering_count(100.4, 10.0), 11);
        assert_eq!(covering_count(0.0, 10.0), 1);
        assert_eq!(covering_count(5.0, 0.0), 1);
    }

    #[test]
    fn test_size_policies() {
        let output = SuggestedOutput { geotransform: [0.0, 1.0, 0.0, 100.0, 0.0, -1.0], width: 100, height: 50 };
        let resized = output.with_size(50, 25);
        assert_eq!(resized.geotransform[1], 2.0);
        assert_eq!(resized.extent(), output.extent());

        let resampled = output.with_pixel_size(3.0, 3.0);
        assert_eq!((resampled.width, resampled.height), (34, 17));
    }
}
