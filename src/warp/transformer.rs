//! Source pixel/line ↔ destination world coordinates

use log::{debug, info};

use crate::coordinate::Coordinates;
use crate::errors::{GeorefError, GeorefResult};
use crate::model::RasterSpatialModel;
use crate::raster::Dataset;
use crate::transformation::{ExactCoordinatesTransformation, PolynomialCoordinatesTransformation};

/// How source pixels are placed in the source reference system
#[derive(Debug, Clone)]
pub enum PixelGeoreference {
    /// Polynomial fitted to the dataset GCPs
    Gcp(PolynomialCoordinatesTransformation),
    /// Affine geotransform
    Affine(RasterSpatialModel),
}

/// Image-to-projection transformer used by the warp
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    georeference: PixelGeoreference,
    reprojection: ExactCoordinatesTransformation,
}

impl ImageTransformer {
    pub fn new(georeference: PixelGeoreference, reprojection: ExactCoordinatesTransformation) -> Self {
        ImageTransformer { georeference, reprojection }
    }

    /// Transformer for `dataset` into `target_wkt`
    ///
    /// GCPs win over a geotransform. An empty target keeps the source
    /// reference system.
    pub fn for_dataset(dataset: &Dataset, target_wkt: &str, order: u32) -> GeorefResult<Self> {
        let (georeference, source_wkt) = if !dataset.gcps().is_empty() {
            let mut polynomial = PolynomialCoordinatesTransformation::new(dataset.gcps().to_vec(), order);
            if !polynomial.initialize() {
                return Err(GeorefError::Transformation(format!(
                    "Cannot fit an order {} polynomial to {} control points", order, dataset.gcps().len())));
            }
            info!("GCP transformer of order {} with RMSE {:.6}", order, polynomial.rmse());
            (PixelGeoreference::Gcp(polynomial), dataset.gcp_srs_wkt.as_str())
        } else {
            let model = dataset.spatial_model().ok_or_else(|| GeorefError::Transformation(
                "Source raster has neither control points nor a valid geotransform".to_string()))?;
            (PixelGeoreference::Affine(model), dataset.srs_wkt.as_str())
        };

        let target_wkt = if target_wkt.trim().is_empty() { source_wkt } else { target_wkt };
        let reprojection = ExactCoordinatesTransformation::new(source_wkt, target_wkt)
            .ok_or_else(|| GeorefError::Transformation(
                "No exact transformation between the source and target reference systems".to_string()))?;
        debug!("Reprojection is identity: {}", reprojection.is_identity());

        Ok(ImageTransformer::new(georeference, reprojection))
    }

    pub fn georeference(&self) -> &PixelGeoreference {
        &self.georeference
    }

    /// Reference system of the destination coordinates
    pub fn target_wkt(&self) -> &str {
        self.reprojection.destination_wkt()
    }

    /// Source pixel/line to destination world, in place
    pub fn pixel_to_world(&self, point: &mut Coordinates) -> bool {
        let mut candidate = *point;
        let placed = match &self.georeference {
            PixelGeoreference::Gcp(polynomial) => polynomial.transform(&mut candidate, false),
            PixelGeoreference::Affine(model) => {
                candidate = model.transformed(&candidate);
                true
            }
        };
        if placed && self.reprojection.transform(&mut candidate, false) && candidate.is_finite() {
            *point = candidate;
            true
        } else {
            false
        }
    }

    /// Destination world to source pixel/line, in place
    pub fn world_to_pixel(&self, point: &mut Coordinates) -> bool {
        let mut candidate = *point;
        if !self.reprojection.transform(&mut candidate, true) {
            return false;
        }
        let placed = match &self.georeference {
            PixelGeoreference::Gcp(polynomial) => polynomial.transform(&mut candidate, true),
            PixelGeoreference::Affine(model) => {
                candidate = model.inverse_transformed(&candidate);
                true
            }
        };
        if placed && candidate.is_finite() {
            *point = candidate;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::SrsCatalog;
    use crate::gcp::GroundControlPoint;
    use crate::raster::DataType;
    use approx::assert_relative_eq;

    #[test]
    fn test_affine_identity() {
        let mut dataset = Dataset::new(10, 10, 1, DataType::Byte);
        dataset.set_geotransform([100.0, 2.0, 0.0, 200.0, 0.0, -2.0]);
        let transformer = ImageTransformer::for_dataset(&dataset, "", 1).unwrap();

        let mut point = Coordinates::new(5.0, 5.0);
        assert!(transformer.pixel_to_world(&mut point));
        assert_relative_eq!(point.x, 110.0);
        assert_relative_eq!(point.y, 190.0);
        assert!(transformer.world_to_pixel(&mut point));
        assert_relative_eq!(point.x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gcps_then_mercator() {
        let mut dataset = Dataset::new(10, 10, 1, DataType::Byte);
        let gcps = vec![
            GroundControlPoint::new(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 1.0)),
            GroundControlPoint::new(Coordinates::new(10.0, 0.0), Coordinates::new(1.0, 1.0)),
            GroundControlPoint::new(Coordinates::new(0.0, 10.0), Coordinates::new(0.0, 0.0)),
        ];
        dataset.set_gcps(gcps, &SrsCatalog::lookup(4326).unwrap().wkt);
        let target = SrsCatalog::lookup(3857).unwrap().wkt;
        let transformer = ImageTransformer::for_dataset(&dataset, &target, 1).unwrap();

        let mut point = Coordinates::new(0.0, 10.0);
        assert!(transformer.pixel_to_world(&mut point));
        assert_relative_eq!(point.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(point.y, 0.0, epsilon = 1e-6);
        assert!(transformer.world_to_pixel(&mut point));
        assert_relative_eq!(point.y, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ungeoreferenced_fails() {
        let dataset = Dataset::new(4, 4, 1, DataType::Byte);
        assert!(ImageTransformer::for_dataset(&dataset, "", 1).is_err());
    }
}
