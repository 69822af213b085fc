//! Factory for creating coordinate transformations by name

use log::{debug, warn};

use crate::gcp::GroundControlPoint;
use super::exact::ExactCoordinatesTransformation;
use super::parameters::{keys, ParameterCollection};
use super::polynomial::PolynomialCoordinatesTransformation;
use super::CoordinatesTransformation;

/// Order used when the parameters do not name one
pub const DEFAULT_ORDER: u32 = 1;

/// Transformation types known to the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    Exact,
    Polynomial,
    Triangulation,
}

impl TransformationKind {
    /// Name the kind is requested by
    pub fn type_name(&self) -> &'static str {
        match self {
            TransformationKind::Exact => "Exact",
            TransformationKind::Polynomial => "Polynomial",
            TransformationKind::Triangulation => "Triangulation",
        }
    }

    /// Whether `name` requests this kind (case-insensitive)
    pub fn matches(&self, name: &str) -> bool {
        self.type_name().eq_ignore_ascii_case(name.trim())
    }

    /// Build a transformation of this kind
    pub fn create(&self, params: &ParameterCollection) -> Option<CoordinatesTransformation> {
        match self {
            TransformationKind::Exact => {
                let source = params.text(keys::SR_WKT_IN).unwrap_or_default();
                let destination = params.text(keys::SR_WKT_OUT).unwrap_or_default();
                match ExactCoordinatesTransformation::new(source, destination) {
                    Some(t) => Some(CoordinatesTransformation::Exact(t)),
                    None => {
                        warn!("No exact transformation available between the given references");
                        None
                    }
                }
            }
            TransformationKind::Polynomial => {
                let gcps: Vec<GroundControlPoint> = params.gcps(keys::GCPS)
                    .map(|g| g.to_vec())
                    .unwrap_or_default();
                let order = match params.integer(keys::ORDER) {
                    Some(order) if order > 0 => order as u32,
                    Some(order) => {
                        warn!("Invalid polynomial order {}", order);
                        return None;
                    }
                    None => DEFAULT_ORDER,
                };

                let mut polynomial = PolynomialCoordinatesTransformation::new(gcps, order).with_references(
                    params.text(keys::SR_WKT_IN).unwrap_or_default(),
                    params.text(keys::SR_WKT_OUT).unwrap_or_default(),
                );
                if polynomial.initialize() {
                    Some(CoordinatesTransformation::Polynomial(polynomial))
                } else {
                    None
                }
            }
            TransformationKind::Triangulation => {
                warn!("Triangulation transformation is not implemented");
                None
            }
        }
    }
}

/// Ordered list of transformation kinds tried by name
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationFactory {
    kinds: Vec<TransformationKind>,
}

impl TransformationFactory {
    /// Build the canonical factory: Exact, Polynomial, Triangulation
    pub fn build() -> Self {
        TransformationFactory {
            kinds: vec![
                TransformationKind::Exact,
                TransformationKind::Polynomial,
                TransformationKind::Triangulation,
            ],
        }
    }

    /// Kinds in the order they are tried
    pub fn kinds(&self) -> &[TransformationKind] {
        &self.kinds
    }

    /// Create a transformation of the named type
    ///
    /// Returns `None` when no kind recognizes `type_name` or when the
    /// recognized kind cannot be built from `params`.
    pub fn create(&self, type_name: &str, params: &ParameterCollection) -> Option<CoordinatesTransformation> {
        match self.kinds.iter().find(|kind| kind.matches(type_name)) {
            Some(kind) => {
                debug!("Creating {} transformation", kind.type_name());
                kind.create(params)
            }
            None => {
                warn!("Unknown transformation type: {}", type_name);
                None
            }
        }
    }
}

impl Default for TransformationFactory {
    fn default() -> Self {
        TransformationFactory::build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{Coordinates, CoordinateSystem};
    use crate::transformation::ParameterValue;

    fn wgs84() -> String {
        CoordinateSystem::WGS84.wkt().unwrap()
    }

    #[test]
    fn test_exact_same_reference_is_identity() {
        let mut params = ParameterCollection::new();
        params.add_value(keys::SR_WKT_IN, ParameterValue::Text(wgs84()))
            .add_value(keys::SR_WKT_OUT, ParameterValue::Text(wgs84()));

        let transformation = TransformationFactory::build().create("Exact", &params).unwrap();
        assert!(transformation.is_identity());
        assert_eq!(transformation.name(), "Exact");
    }

    #[test]
    fn test_exact_web_mercator() {
        let mut params = ParameterCollection::new();
        params.add_value(keys::SR_WKT_IN, ParameterValue::Text(wgs84()))
            .add_value(keys::SR_WKT_OUT, ParameterValue::Text(CoordinateSystem::WebMercator.wkt().unwrap()));

        let transformation = TransformationFactory::build().create("exact", &params).unwrap();
        assert!(!transformation.is_identity());
        let mut point = Coordinates::new(0.0, 0.0);
        assert!(transformation.transform(&mut point, false));
        assert!(point.x.abs() < 1e-6 && point.y.abs() < 1e-6);
    }

    #[test]
    fn test_polynomial_needs_enough_points() {
        let gcps = vec![
            GroundControlPoint::new(Coordinates::new(0.0, 0.0), Coordinates::new(10.0, 10.0)),
            GroundControlPoint::new(Coordinates::new(1.0, 0.0), Coordinates::new(11.0, 10.0)),
        ];
        let mut params = ParameterCollection::new();
        params.add_value(keys::GCPS, ParameterValue::Gcps(gcps.clone()))
            .add_value(keys::ORDER, ParameterValue::Integer(1));
        let factory = TransformationFactory::build();
        assert!(factory.create("Polynomial", &params).is_none());

        let mut more = gcps;
        more.push(GroundControlPoint::new(Coordinates::new(0.0, 1.0), Coordinates::new(10.0, 11.0)));
        params.add_value(keys::GCPS, ParameterValue::Gcps(more));
        let transformation = factory.create("Polynomial", &params).unwrap();
        assert!(transformation.is_ok());
        assert!(transformation.rmse() < 1e-9);
    }

    #[test]
    fn test_unknown_and_unimplemented_types() {
        let factory = TransformationFactory::build();
        let params = ParameterCollection::new();
        assert!(factory.create("Triangulation", &params).is_none());
        assert!(factory.create("Spline", &params).is_none());
        assert_eq!(factory.kinds().len(), 3);
    }
}
