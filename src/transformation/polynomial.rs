//! Polynomial transformation fitted from ground control points
//!
//! Both directions are fitted independently by least squares:
//!
//! ```text
//! x' = Σ a_ij · u^i · v^j      (i + j ≤ order)
//! y' = Σ b_ij · u^i · v^j
//! ```
//!
//! where `(u, v)` are the input coordinates shifted to the centroid of the
//! control points and divided by their spread, which keeps the normal system
//! well conditioned for large world coordinates.

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

use crate::coordinate::Coordinates;
use crate::gcp::GroundControlPoint;

/// Highest supported polynomial order
pub const MAX_ORDER: u32 = 3;

/// Singular values below this fraction of the largest are treated as zero
const RANK_TOLERANCE: f64 = 1e-10;

/// Number of coefficients per axis for a polynomial of the given order
pub fn coefficient_count(order: u32) -> usize {
    ((order + 1) * (order + 2) / 2) as usize
}

/// Minimum number of control points needed to fit the given order
pub fn minimum_gcps(order: u32) -> usize {
    coefficient_count(order)
}

/// Fitted coefficients for one direction
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialCoefficients {
    /// Centroid subtracted from the input before evaluation
    pub center: Coordinates,
    /// Spread the centered input is divided by
    pub scale: f64,
    /// Coefficients producing x, in term order 1, u, v, u², uv, v², ...
    pub x: Vec<f64>,
    /// Coefficients producing y, same term order as `x`
    pub y: Vec<f64>,
}

impl PolynomialCoefficients {
    fn evaluate(&self, order: u32, point: &Coordinates) -> Coordinates {
        let u = (point.x - self.center.x) / self.scale;
        let v = (point.y - self.center.y) / self.scale;
        let terms = terms(order, u, v);
        let x = terms.iter().zip(&self.x).map(|(t, c)| t * c).sum();
        let y = terms.iter().zip(&self.y).map(|(t, c)| t * c).sum();
        Coordinates::new_3d(x, y, point.z)
    }

    fn fit(order: u32, inputs: &[Coordinates], outputs: &[Coordinates]) -> Option<Self> {
        let count = inputs.len() as f64;
        let center = Coordinates::new(
            inputs.iter().map(|p| p.x).sum::<f64>() / count,
            inputs.iter().map(|p| p.y).sum::<f64>() / count,
        );
        let spread = inputs.iter()
            .map(|p| (p.x - center.x).abs().max((p.y - center.y).abs()))
            .fold(0.0, f64::max);
        let scale = if spread > 0.0 && spread.is_finite() { spread } else { 1.0 };

        let columns = coefficient_count(order);
        let design = DMatrix::from_fn(inputs.len(), columns, |row, col| {
            let p = &inputs[row];
            terms(order, (p.x - center.x) / scale, (p.y - center.y) / scale)[col]
        });

        let svd = design.svd(true, true);
        let largest = svd.singular_values.iter().cloned().fold(0.0, f64::max);
        let tolerance = largest * RANK_TOLERANCE;
        if largest == 0.0 || svd.rank(tolerance) < columns {
            debug!("Control point configuration is rank deficient for order {}", order);
            return None;
        }

        let bx = DVector::from_iterator(outputs.len(), outputs.iter().map(|p| p.x));
        let by = DVector::from_iterator(outputs.len(), outputs.iter().map(|p| p.y));
        let x = svd.solve(&bx, tolerance).ok()?;
        let y = svd.solve(&by, tolerance).ok()?;

        Some(PolynomialCoefficients {
            center,
            scale,
            x: x.iter().cloned().collect(),
            y: y.iter().cloned().collect(),
        })
    }
}

/// Monomials `u^i v^j` with `i + j ≤ order`, grouped by total degree
fn terms(order: u32, u: f64, v: f64) -> Vec<f64> {
    let mut values = Vec::with_capacity(coefficient_count(order));
    for degree in 0..=order {
        for j in 0..=degree {
            let i = degree - j;
            values.push(u.powi(i as i32) * v.powi(j as i32));
        }
    }
    values
}

/// Polynomial transformation between GCP source and destination spaces
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialCoordinatesTransformation {
    order: u32,
    gcps: Vec<GroundControlPoint>,
    forward: Option<PolynomialCoefficients>,
    inverse: Option<PolynomialCoefficients>,
    coefficients_supplied: bool,
    initialized: bool,
    source_wkt: String,
    destination_wkt: String,
}

impl PolynomialCoordinatesTransformation {
    /// Create a transformation to be fitted from control points
    pub fn new(gcps: Vec<GroundControlPoint>, order: u32) -> Self {
        PolynomialCoordinatesTransformation {
            order,
            gcps,
            forward: None,
            inverse: None,
            coefficients_supplied: false,
            initialized: false,
            source_wkt: String::new(),
            destination_wkt: String::new(),
        }
    }

    /// Create a transformation from already known coefficients
    ///
    /// `gcps` are kept for residual reporting only.
    pub fn from_coefficients(
        order: u32,
        forward: PolynomialCoefficients,
        inverse: PolynomialCoefficients,
        gcps: Vec<GroundControlPoint>,
    ) -> Self {
        PolynomialCoordinatesTransformation {
            order,
            gcps,
            forward: Some(forward),
            inverse: Some(inverse),
            coefficients_supplied: true,
            initialized: false,
            source_wkt: String::new(),
            destination_wkt: String::new(),
        }
    }

    /// Attach the spatial references of both spaces
    pub fn with_references(mut self, source_wkt: &str, destination_wkt: &str) -> Self {
        self.source_wkt = source_wkt.to_string();
        self.destination_wkt = destination_wkt.to_string();
        self
    }

    /// Fit (or validate supplied) coefficients
    ///
    /// Returns `false` when there are too few control points, the order is
    /// not supported, or the points do not determine the polynomial.
    pub fn initialize(&mut self) -> bool {
        self.initialized = false;

        if self.order == 0 || self.order > MAX_ORDER {
            warn!("Unsupported polynomial order {}", self.order);
            return false;
        }

        if self.coefficients_supplied {
            self.initialized = self.coefficients_match();
            if !self.initialized {
                warn!("Supplied coefficients do not match order {}", self.order);
            }
            return self.initialized;
        }

        let required = minimum_gcps(self.order);
        if self.gcps.len() < required {
            info!("Polynomial order {} needs {} control points, have {}",
                  self.order, required, self.gcps.len());
            return false;
        }

        let sources: Vec<Coordinates> = self.gcps.iter().map(|g| g.source()).collect();
        let destinations: Vec<Coordinates> = self.gcps.iter().map(|g| g.destination()).collect();

        self.forward = PolynomialCoefficients::fit(self.order, &sources, &destinations);
        self.inverse = PolynomialCoefficients::fit(self.order, &destinations, &sources);
        self.initialized = self.forward.is_some() && self.inverse.is_some();

        if self.initialized {
            debug!("Fitted order {} polynomial from {} control points", self.order, self.gcps.len());
        } else {
            warn!("Could not fit order {} polynomial from {} control points", self.order, self.gcps.len());
        }
        self.initialized
    }

    fn coefficients_match(&self) -> bool {
        let expected = coefficient_count(self.order);
        [&self.forward, &self.inverse].iter().all(|c| match c {
            Some(c) => c.x.len() == expected && c.y.len() == expected && c.scale != 0.0,
            None => false,
        })
    }

    /// True once the transformation was successfully initialized
    pub fn is_ok(&self) -> bool {
        if !self.initialized || !self.coefficients_match() {
            return false;
        }
        self.coefficients_supplied || self.gcps.len() >= minimum_gcps(self.order)
    }

    /// A fitted polynomial is never the identity
    pub fn is_identity(&self) -> bool {
        false
    }

    /// Configured order
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Control points the transformation was built from
    pub fn gcps(&self) -> &[GroundControlPoint] {
        &self.gcps
    }

    /// Coefficients of the requested direction, once fitted
    pub fn coefficients(&self, inverse: bool) -> Option<&PolynomialCoefficients> {
        if inverse { self.inverse.as_ref() } else { self.forward.as_ref() }
    }

    /// WKT of the source reference, if attached
    pub fn source_wkt(&self) -> &str {
        &self.source_wkt
    }

    /// WKT of the destination reference, if attached
    pub fn destination_wkt(&self) -> &str {
        &self.destination_wkt
    }

    /// Transform one point in place; `false` leaves it unchanged
    pub fn transform(&self, point: &mut Coordinates, inverse: bool) -> bool {
        if !self.is_ok() {
            return false;
        }
        let coefficients = match self.coefficients(inverse) {
            Some(c) => c,
            None => return false,
        };

        let result = coefficients.evaluate(self.order, point);
        if !result.is_finite() {
            return false;
        }
        *point = result;
        true
    }

    /// Transform every point in place, returning how many succeeded
    pub fn transform_many(&self, points: &mut [Coordinates], inverse: bool) -> usize {
        points.iter_mut().map(|p| self.transform(p, inverse)).filter(|ok| *ok).count()
    }

    /// Destination-space residual `(dx, dy)` of each control point
    pub fn residuals(&self) -> Vec<(f64, f64)> {
        if !self.is_ok() {
            return Vec::new();
        }
        self.gcps.iter().map(|gcp| {
            let mut predicted = gcp.source();
            self.transform(&mut predicted, false);
            (predicted.x - gcp.destination().x, predicted.y - gcp.destination().y)
        }).collect()
    }

    /// Mean distance between predicted and actual destinations
    ///
    /// 0 when the transformation is not usable or has no control points.
    pub fn rmse(&self) -> f64 {
        let residuals = self.residuals();
        if residuals.is_empty() {
            return 0.0;
        }
        residuals.iter().map(|(dx, dy)| dx.hypot(*dy)).sum::<f64>() / residuals.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_gcps<F: Fn(f64, f64) -> (f64, f64)>(n: usize, f: F) -> Vec<GroundControlPoint> {
        let mut gcps = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let (x, y) = (i as f64 * 100.0, j as f64 * 80.0);
                let (dx, dy) = f(x, y);
                gcps.push(GroundControlPoint::new(Coordinates::new(x, y), Coordinates::new(dx, dy)));
            }
        }
        gcps
    }

    #[test]
    fn test_minimum_gcps() {
        assert_eq!(minimum_gcps(1), 3);
        assert_eq!(minimum_gcps(2), 6);
        assert_eq!(minimum_gcps(3), 10);
    }

    #[test]
    fn test_too_few_points_fail() {
        for order in 1..=MAX_ORDER {
            let gcps: Vec<_> = grid_gcps(4, |x, y| (x, y)).into_iter().take(minimum_gcps(order) - 1).collect();
            let mut transformation = PolynomialCoordinatesTransformation::new(gcps, order);
            assert!(!transformation.initialize());
            assert!(!transformation.is_ok());
            assert_eq!(transformation.rmse(), 0.0);
            let mut point = Coordinates::new(1.0, 1.0);
            assert!(!transformation.transform(&mut point, false));
            assert_eq!(point, Coordinates::new(1.0, 1.0));
        }
    }

    #[test]
    fn test_exact_affine_fit_has_zero_rmse() {
        let affine = |x: f64, y: f64| (500000.0 + 30.0 * x + 0.5 * y, 6200000.0 - 0.25 * x - 30.0 * y);
        let mut transformation = PolynomialCoordinatesTransformation::new(grid_gcps(3, affine), 1);
        assert!(transformation.initialize());
        assert!(transformation.is_ok());
        assert!(!transformation.is_identity());
        assert!(transformation.rmse() < 1e-6);

        let mut point = Coordinates::new(37.0, 91.0);
        assert!(transformation.transform(&mut point, false));
        let (ex, ey) = affine(37.0, 91.0);
        assert_relative_eq!(point.x, ex, epsilon = 1e-6);
        assert_relative_eq!(point.y, ey, epsilon = 1e-6);

        assert!(transformation.transform(&mut point, true));
        assert_relative_eq!(point.x, 37.0, epsilon = 1e-6);
        assert_relative_eq!(point.y, 91.0, epsilon = 1e-6);
    }

    #[test]
    fn test_transform_many_counts_successes() {
        let shift = |x: f64, y: f64| (x + 10.0, y - 5.0);
        let mut transformation = PolynomialCoordinatesTransformation::new(grid_gcps(3, shift), 1);
        let mut points = vec![Coordinates::new(0.0, 0.0), Coordinates::new(4.0, 2.0)];
        assert_eq!(transformation.transform_many(&mut points, false), 0);
        assert_eq!(points[1], Coordinates::new(4.0, 2.0));

        assert!(transformation.initialize());
        assert_eq!(transformation.transform_many(&mut points, false), 2);
        assert_relative_eq!(points[1].x, 14.0, epsilon = 1e-6);
        assert_relative_eq!(points[1].y, -3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_exact_quadratic_fit_has_zero_rmse() {
        let quadratic = |x: f64, y: f64| (x + 0.001 * x * x - 0.002 * x * y, y + 0.0005 * y * y);
        let mut transformation = PolynomialCoordinatesTransformation::new(grid_gcps(4, quadratic), 2);
        assert!(transformation.initialize());
        assert!(transformation.rmse() < 1e-8);
    }

    #[test]
    fn test_collinear_points_fail() {
        let gcps: Vec<_> = (0..5)
            .map(|i| GroundControlPoint::new(
                Coordinates::new(i as f64, i as f64),
                Coordinates::new(2.0 * i as f64, 2.0 * i as f64)))
            .collect();
        let mut transformation = PolynomialCoordinatesTransformation::new(gcps, 1);
        assert!(!transformation.initialize());
        assert!(!transformation.is_ok());
    }

    #[test]
    fn test_rmse_of_noisy_points() {
        let mut gcps = grid_gcps(3, |x, y| (x, y));
        // push one destination off by 9 units
        let moved = gcps[4];
        gcps[4] = GroundControlPoint::new(moved.source(), Coordinates::new(moved.destination().x + 9.0, moved.destination().y));
        let mut transformation = PolynomialCoordinatesTransformation::new(gcps, 1);
        assert!(transformation.initialize());
        assert!(transformation.rmse() > 0.0);
        assert_eq!(transformation.residuals().len(), 9);
    }

    #[test]
    fn test_supplied_coefficients() {
        let identity = PolynomialCoefficients {
            center: Coordinates::new(0.0, 0.0),
            scale: 1.0,
            x: vec![0.0, 1.0, 0.0],
            y: vec![0.0, 0.0, 1.0],
        };
        let mut transformation = PolynomialCoordinatesTransformation::from_coefficients(
            1, identity.clone(), identity.clone(), Vec::new());
        assert!(!transformation.is_ok());
        assert!(transformation.initialize());
        assert!(transformation.is_ok());
        let mut point = Coordinates::new(3.0, 4.0);
        assert!(transformation.transform(&mut point, false));
        assert_eq!(point, Coordinates::new(3.0, 4.0));

        let mut wrong = PolynomialCoordinatesTransformation::from_coefficients(2, identity.clone(), identity, Vec::new());
        assert!(!wrong.initialize());
    }
}
