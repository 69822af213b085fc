//! Affine mapping between raster pixel/line space and world coordinates

use log::{debug, warn};

use crate::coordinate::{Coordinates, Subset};
use super::parameters::{matrix_index::*, parameters_to_wkt, wkt_to_parameters, Parameters, PixelModel};

/// Relative determinant threshold below which a matrix is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Invertible affine raster model
///
/// Forward maps pixel/line to world, inverse maps world to pixel/line. Both
/// matrices are built together at construction so a model that exists is
/// always invertible.
///
/// `transformed`, `inverse_transformed` and their subset forms return new
/// values. The `*_transform*` methods rewrite their argument in place for
/// callers that walk buffers of points.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSpatialModel {
    forward: [f64; 6],
    inverse: [f64; 6],
}

impl RasterSpatialModel {
    /// Create a model from a `PARAM_MT` WKT string
    pub fn create_from_wkt(wkt: &str) -> Option<Self> {
        match wkt_to_parameters(wkt) {
            Ok(parameters) => Self::create(&parameters),
            Err(e) => {
                warn!("Invalid raster model WKT: {}", e);
                None
            }
        }
    }

    /// Create a model from parameters; `None` if they are singular or invalid
    pub fn create(parameters: &Parameters) -> Option<Self> {
        let forward = parameters.effective_matrix()?;
        let inverse = invert(&forward)?;
        Some(RasterSpatialModel { forward, inverse })
    }

    /// Create a model from a GDAL-ordered geotransform
    pub fn from_geotransform(geotransform: [f64; 6]) -> Option<Self> {
        Self::create(&Parameters::from_matrix(geotransform))
    }

    /// Create a model mapping one rectangle onto another
    ///
    /// `in_ul`/`in_lr` are pixel/line corners and `out_ul`/`out_lr` their world
    /// positions. `rotation` is applied clockwise, in degrees, about `in_ul`.
    pub fn create_from_corners(
        in_ul: &Coordinates,
        in_lr: &Coordinates,
        out_ul: &Coordinates,
        out_lr: &Coordinates,
        rotation: f64,
    ) -> Option<Self> {
        let in_width = in_lr.x - in_ul.x;
        let in_height = in_lr.y - in_ul.y;
        if in_width == 0.0 || in_height == 0.0 {
            debug!("Degenerate pixel window {:?} - {:?}", in_ul, in_lr);
            return None;
        }

        let pixel_model = PixelModel {
            pixel_size_x: (out_lr.x - out_ul.x) / in_width,
            pixel_size_y: (out_lr.y - out_ul.y) / in_height,
            rotation_degrees: rotation,
            tie_point_pl: *in_ul,
            tie_point_xy: *out_ul,
        };
        Self::create(&Parameters::from_pixel_model(pixel_model))
    }

    /// Pixel/line to world
    pub fn transformed(&self, point: &Coordinates) -> Coordinates {
        let mut result = *point;
        apply(&self.forward, &mut result);
        result
    }

    /// World to pixel/line
    pub fn inverse_transformed(&self, point: &Coordinates) -> Coordinates {
        let mut result = *point;
        apply(&self.inverse, &mut result);
        result
    }

    /// Pixel/line subset mapped to world
    pub fn transformed_subset(&self, subset: &Subset) -> Subset {
        let mut result = *subset;
        self.transform_subset(&mut result);
        result
    }

    /// World subset mapped to pixel/line
    pub fn inverse_transformed_subset(&self, subset: &Subset) -> Subset {
        let mut result = *subset;
        self.inverse_transform_subset(&mut result);
        result
    }

    /// Pixel/line to world, in place
    pub fn transform(&self, point: &mut Coordinates) {
        apply(&self.forward, point);
    }

    /// Pixel/line to world for every point, in place
    pub fn transform_many(&self, points: &mut [Coordinates]) {
        points.iter_mut().for_each(|p| apply(&self.forward, p));
    }

    /// Pixel/line to world for both subset corners, in place
    pub fn transform_subset(&self, subset: &mut Subset) {
        apply(&self.forward, &mut subset.ul);
        apply(&self.forward, &mut subset.lr);
    }

    /// World to pixel/line, in place
    pub fn inverse_transform(&self, point: &mut Coordinates) {
        apply(&self.inverse, point);
    }

    /// World to pixel/line for every point, in place
    pub fn inverse_transform_many(&self, points: &mut [Coordinates]) {
        points.iter_mut().for_each(|p| apply(&self.inverse, p));
    }

    /// World to pixel/line for both subset corners, in place
    pub fn inverse_transform_subset(&self, subset: &mut Subset) {
        apply(&self.inverse, &mut subset.ul);
        apply(&self.inverse, &mut subset.lr);
    }

    /// WKT of the forward (or inverse) model
    pub fn wkt(&self, inverse: bool) -> String {
        let parameters = self.model_parameters(inverse);
        // matrices held by a model are always finite, so encoding cannot fail
        parameters_to_wkt(&parameters).unwrap_or_default()
    }

    /// Matrix parameters of the forward (or inverse) model
    pub fn model_parameters(&self, inverse: bool) -> Parameters {
        Parameters::from_matrix(if inverse { self.inverse } else { self.forward })
    }

    /// Forward matrix in GDAL geotransform order
    pub fn geotransform(&self) -> [f64; 6] {
        self.forward
    }

    /// World length of one pixel step and one line step
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.forward[AXP].hypot(self.forward[AYP]),
            self.forward[AXL].hypot(self.forward[AYL]),
        )
    }

    /// Clockwise rotation of the pixel axis, in degrees
    pub fn rotation_degrees(&self) -> f64 {
        (-self.forward[AYP]).atan2(self.forward[AXP]).to_degrees()
    }

    /// True when the model has no rotation or shear terms
    pub fn is_north_up(&self) -> bool {
        self.forward[AXL] == 0.0 && self.forward[AYP] == 0.0
    }
}

fn apply(matrix: &[f64; 6], point: &mut Coordinates) {
    let x = matrix[AX0] + matrix[AXP] * point.x + matrix[AXL] * point.y;
    let y = matrix[AY0] + matrix[AYP] * point.x + matrix[AYL] * point.y;
    point.x = x;
    point.y = y;
}

fn invert(matrix: &[f64; 6]) -> Option<[f64; 6]> {
    let det = matrix[AXP] * matrix[AYL] - matrix[AXL] * matrix[AYP];
    let scale = (matrix[AXP] * matrix[AYL]).abs() + (matrix[AXL] * matrix[AYP]).abs();
    if !det.is_finite() || scale == 0.0 || det.abs() <= SINGULAR_TOLERANCE * scale {
        debug!("Singular raster model matrix {:?}", matrix);
        return None;
    }

    let mut inverse = [0.0; 6];
    inverse[AXP] = matrix[AYL] / det;
    inverse[AXL] = -matrix[AXL] / det;
    inverse[AYP] = -matrix[AYP] / det;
    inverse[AYL] = matrix[AXP] / det;
    inverse[AX0] = -(inverse[AXP] * matrix[AX0] + inverse[AXL] * matrix[AY0]);
    inverse[AY0] = -(inverse[AYP] * matrix[AX0] + inverse[AYL] * matrix[AY0]);
    Some(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_models() -> Vec<RasterSpatialModel> {
        let matrices = [
            [500000.0, 30.0, 0.0, 6200000.0, 0.0, -30.0],
            [-58.5, 0.00027, 0.00001, -34.5, 0.00002, -0.00027],
            [10.0, 2.0, 1.0, -5.0, -1.0, 3.0],
        ];
        matrices.iter().filter_map(|m| RasterSpatialModel::from_geotransform(*m)).collect()
    }

    #[test]
    fn test_inverse_undoes_forward() {
        let models = sample_models();
        assert_eq!(models.len(), 3);
        for model in &models {
            for &(p, l) in &[(0.0, 0.0), (123.5, 77.25), (-10.0, 4000.0), (1e4, 1e4)] {
                let original = Coordinates::new(p, l);
                let point = model.inverse_transformed(&model.transformed(&original));
                assert_relative_eq!(point.x, original.x, epsilon = 1e-6);
                assert_relative_eq!(point.y, original.y, epsilon = 1e-6);

                let mut in_place = original;
                model.transform(&mut in_place);
                assert_eq!(in_place, model.transformed(&original));
            }
        }
    }

    #[test]
    fn test_wkt_reconstructs_model() {
        for model in sample_models() {
            let rebuilt = RasterSpatialModel::create_from_wkt(&model.wkt(false)).unwrap();
            let mut a = Coordinates::new(17.0, 42.0);
            let mut b = a;
            model.transform(&mut a);
            rebuilt.transform(&mut b);
            assert_eq!(a, b);

            let inverse = RasterSpatialModel::create_from_wkt(&model.wkt(true)).unwrap();
            inverse.transform(&mut b);
            assert_relative_eq!(b.x, 17.0, epsilon = 1e-6);
            assert_relative_eq!(b.y, 42.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_singular_models_are_rejected() {
        assert!(RasterSpatialModel::from_geotransform([0.0, 1.0, 2.0, 0.0, 2.0, 4.0]).is_none());
        assert!(RasterSpatialModel::from_geotransform([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).is_none());
        assert!(RasterSpatialModel::from_geotransform([0.0, f64::NAN, 0.0, 0.0, 0.0, 1.0]).is_none());
        let corner = Coordinates::new(5.0, 5.0);
        assert!(RasterSpatialModel::create_from_corners(
            &corner, &corner, &Coordinates::new(0.0, 0.0), &Coordinates::new(1.0, 1.0), 0.0).is_none());
    }

    #[test]
    fn test_create_from_corners() {
        let model = RasterSpatialModel::create_from_corners(
            &Coordinates::new(0.0, 0.0),
            &Coordinates::new(100.0, 50.0),
            &Coordinates::new(1000.0, 2000.0),
            &Coordinates::new(2000.0, 1500.0),
            0.0,
        ).unwrap();
        assert_eq!(model.geotransform(), [1000.0, 10.0, -0.0, 2000.0, -0.0, -10.0]);
        assert_eq!(model.pixel_size(), (10.0, 10.0));
        assert!(model.is_north_up());

        let world = Subset::from_corners(1000.0, 2000.0, 2000.0, 1500.0);
        let pixels = model.inverse_transformed_subset(&world);
        assert_eq!(pixels, Subset::from_corners(0.0, 0.0, 100.0, 50.0));
        assert_eq!(model.transformed_subset(&pixels), world);
    }

    #[test]
    fn test_rotation_is_reported() {
        let model = RasterSpatialModel::create_from_corners(
            &Coordinates::new(0.0, 0.0),
            &Coordinates::new(10.0, 10.0),
            &Coordinates::new(0.0, 0.0),
            &Coordinates::new(10.0, -10.0),
            30.0,
        ).unwrap();
        assert_relative_eq!(model.rotation_degrees(), 30.0, epsilon = 1e-9);
        assert!(!model.is_north_up());
    }
}
