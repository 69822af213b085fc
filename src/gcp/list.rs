//! Ordered collection of control points plus their reference systems

use super::point::{GroundControlPoint, GroundControlPointExtended};

/// List of control points and the reference information they relate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcpList {
    points: Vec<GroundControlPointExtended>,
    /// WKT of the source spatial reference
    pub source_srs_wkt: String,
    /// WKT of the destination spatial reference
    pub destination_srs_wkt: String,
    /// Raster model WKT of the source image
    pub source_raster_model_wkt: String,
    /// Raster model WKT of the destination image
    pub destination_raster_model_wkt: String,
    /// Identifier of the base (reference) datasource
    pub base_datasource: String,
    /// Identifier of the datasource being warped
    pub warp_datasource: String,
    /// Name of the transformation these points were collected for
    pub transformation_name: String,
    /// Free-form transformation parameters (e.g. `order=2`)
    pub transformation_parameters: String,
}

impl GcpList {
    /// Create an empty list
    pub fn new() -> Self {
        GcpList::default()
    }

    /// Append a control point
    pub fn add(&mut self, point: GroundControlPointExtended) {
        self.points.push(point);
    }

    /// Remove every control point, keeping the reference attributes
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// All control points, enabled or not
    pub fn points(&self) -> &[GroundControlPointExtended] {
        &self.points
    }

    /// Mutable access to a single control point
    pub fn point_mut(&mut self, index: usize) -> Option<&mut GroundControlPointExtended> {
        self.points.get_mut(index)
    }

    /// Enabled points as plain pairs, ready for fitting
    pub fn adapted_points(&self) -> Vec<GroundControlPoint> {
        self.points.iter()
            .filter(|p| p.is_enabled())
            .map(|p| p.point())
            .collect()
    }

    /// Number of control points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the list holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of enabled control points
    pub fn enabled_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_enabled()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Coordinates;

    #[test]
    fn test_adapted_points_skip_disabled() {
        let mut list = GcpList::new();
        list.add(GroundControlPointExtended::new(Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 1.0)));
        list.add(GroundControlPointExtended::with_enabled(
            Coordinates::new(5.0, 5.0), Coordinates::new(6.0, 6.0), false));
        list.add(GroundControlPointExtended::new(Coordinates::new(9.0, 9.0), Coordinates::new(10.0, 10.0)));

        assert_eq!(list.len(), 3);
        assert_eq!(list.enabled_count(), 2);
        let adapted = list.adapted_points();
        assert_eq!(adapted.len(), 2);
        assert_eq!(adapted[1].source(), Coordinates::new(9.0, 9.0));

        list.point_mut(1).unwrap().set_enabled(true);
        assert_eq!(list.adapted_points().len(), 3);

        list.source_srs_wkt = "LOCAL_CS[\"a\"]".to_string();
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.source_srs_wkt, "LOCAL_CS[\"a\"]");
    }
}
