//! Coordinate transformations
//!
//! A transformation is either an exact conversion between two spatial
//! references or a polynomial fitted from ground control points. Both are
//! created by name through the `TransformationFactory`.

mod parameters;
mod exact;
mod polynomial;
mod factory;

pub use self::parameters::{keys, ParameterCollection, ParameterValue};
pub use self::exact::ExactCoordinatesTransformation;
pub use self::polynomial::{
    coefficient_count, minimum_gcps, PolynomialCoefficients, PolynomialCoordinatesTransformation, MAX_ORDER,
};
pub use self::factory::{TransformationFactory, TransformationKind, DEFAULT_ORDER};

use log::trace;

use crate::coordinate::{Coordinates, Subset};

/// Any transformation the factory can produce
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatesTransformation {
    Exact(ExactCoordinatesTransformation),
    Polynomial(PolynomialCoordinatesTransformation),
}

impl CoordinatesTransformation {
    /// Type name, as understood by the factory
    pub fn name(&self) -> &'static str {
        match self {
            CoordinatesTransformation::Exact(_) => TransformationKind::Exact.type_name(),
            CoordinatesTransformation::Polynomial(_) => TransformationKind::Polynomial.type_name(),
        }
    }

    pub fn is_identity(&self) -> bool {
        match self {
            CoordinatesTransformation::Exact(t) => t.is_identity(),
            CoordinatesTransformation::Polynomial(t) => t.is_identity(),
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            CoordinatesTransformation::Exact(_) => true,
            CoordinatesTransformation::Polynomial(t) => t.is_ok(),
        }
    }

    /// Transform one point in place; `false` leaves it unchanged
    pub fn transform(&self, point: &mut Coordinates, inverse: bool) -> bool {
        match self {
            CoordinatesTransformation::Exact(t) => t.transform(point, inverse),
            CoordinatesTransformation::Polynomial(t) => t.transform(point, inverse),
        }
    }

    /// Transform every point in place, returning how many succeeded
    pub fn transform_many(&self, points: &mut [Coordinates], inverse: bool) -> usize {
        points.iter_mut().map(|p| self.transform(p, inverse)).filter(|ok| *ok).count()
    }

    /// Transform a bounding box by sampling a grid of points across it
    ///
    /// A `calculation_points` × `calculation_points` grid is transformed and
    /// the subset is replaced by the box enclosing every sample that
    /// succeeded. The result keeps the corner orientation of the transformed
    /// `ul`/`lr` pair. Returns the number of samples transformed.
    pub fn transform_subset(&self, subset: &mut Subset, calculation_points: usize, inverse: bool) -> usize {
        if self.is_identity() {
            return calculation_points * calculation_points;
        }
        if calculation_points < 2 {
            return 0;
        }

        let step_x = (subset.lr.x - subset.ul.x) / (calculation_points - 1) as f64;
        let step_y = (subset.lr.y - subset.ul.y) / (calculation_points - 1) as f64;

        let mut samples = Vec::with_capacity(calculation_points * calculation_points);
        for row in 0..calculation_points {
            for col in 0..calculation_points {
                samples.push(Coordinates::new(
                    subset.ul.x + step_x * col as f64,
                    subset.ul.y + step_y * row as f64,
                ));
            }
        }

        let mut ul = subset.ul;
        let mut lr = subset.lr;
        let corners_ok = self.transform(&mut ul, inverse) && self.transform(&mut lr, inverse);

        let mut transformed = Vec::with_capacity(samples.len());
        for mut sample in samples {
            if self.transform(&mut sample, inverse) {
                transformed.push(sample);
            }
        }

        let enclosing = match Subset::enclosing(&transformed) {
            Some(enclosing) => enclosing,
            None => return 0,
        };
        trace!("Sampled {} of {} subset points", transformed.len(), calculation_points * calculation_points);

        let (min_x, max_x) = (enclosing.min_x(), enclosing.max_x());
        let (min_y, max_y) = (enclosing.min_y(), enclosing.max_y());
        let (x_ascending, y_ascending) = if corners_ok {
            (ul.x <= lr.x, ul.y <= lr.y)
        } else {
            (subset.ul.x <= subset.lr.x, subset.ul.y <= subset.lr.y)
        };

        subset.ul = Coordinates::new(
            if x_ascending { min_x } else { max_x },
            if y_ascending { min_y } else { max_y },
        );
        subset.lr = Coordinates::new(
            if x_ascending { max_x } else { min_x },
            if y_ascending { max_y } else { min_y },
        );
        transformed.len()
    }

    /// Mean residual of the fitted control points, 0 for exact transformations
    pub fn rmse(&self) -> f64 {
        match self {
            CoordinatesTransformation::Exact(_) => 0.0,
            CoordinatesTransformation::Polynomial(t) => t.rmse(),
        }
    }

    /// The polynomial variant, if this is one
    pub fn as_polynomial(&self) -> Option<&PolynomialCoordinatesTransformation> {
        match self {
            CoordinatesTransformation::Polynomial(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::GroundControlPoint;
    use approx::assert_relative_eq;

    fn quadratic_transformation() -> CoordinatesTransformation {
        let mut gcps = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                let (x, y) = (i as f64 * 25.0, j as f64 * 25.0);
                gcps.push(GroundControlPoint::new(
                    Coordinates::new(x, y),
                    Coordinates::new(x + 0.01 * x * x, -y),
                ));
            }
        }
        let mut polynomial = PolynomialCoordinatesTransformation::new(gcps, 2);
        assert!(polynomial.initialize());
        CoordinatesTransformation::Polynomial(polynomial)
    }

    #[test]
    fn test_identity_fast_path() {
        let exact = ExactCoordinatesTransformation::new("LOCAL_CS[\"a\"]", "LOCAL_CS[\"a\"]").unwrap();
        let transformation = CoordinatesTransformation::Exact(exact);
        let mut subset = Subset::new(Coordinates::new(0.0, 0.0), Coordinates::new(10.0, 10.0));
        assert_eq!(transformation.transform_subset(&mut subset, 5, false), 25);
        assert_eq!(transformation.transform_subset(&mut subset, 1, false), 1);
        assert_eq!(subset, Subset::new(Coordinates::new(0.0, 0.0), Coordinates::new(10.0, 10.0)));
    }

    #[test]
    fn test_transform_many_round_trip() {
        let transformation = quadratic_transformation();
        let mut points = vec![Coordinates::new(10.0, 20.0), Coordinates::new(50.0, 0.0)];
        assert_eq!(transformation.transform_many(&mut points, false), 2);
        assert_relative_eq!(points[1].x, 75.0, epsilon = 1e-6);
        assert_relative_eq!(points[0].y, -20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_too_few_calculation_points_is_noop() {
        let transformation = quadratic_transformation();
        let original = Subset::new(Coordinates::new(0.0, 0.0), Coordinates::new(100.0, 100.0));
        let mut subset = original;
        assert_eq!(transformation.transform_subset(&mut subset, 1, false), 0);
        assert_eq!(subset, original);
    }

    #[test]
    fn test_grid_sampling_encloses_samples() {
        let transformation = quadratic_transformation();
        let mut subset = Subset::new(Coordinates::new(0.0, 0.0), Coordinates::new(100.0, 100.0));
        assert_eq!(transformation.transform_subset(&mut subset, 11, false), 121);
        // x' = x + 0.01x², y' = -y
        assert_relative_eq!(subset.ul.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(subset.lr.x, 200.0, epsilon = 1e-6);
        assert_relative_eq!(subset.ul.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(subset.lr.y, -100.0, epsilon = 1e-6);
    }
}
