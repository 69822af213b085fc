//! Settings of one georeference or reprojection run

use std::path::PathBuf;

use log::{debug, warn};

use crate::coordinate::{CoordinateSystemFactory, Subset};
use crate::errors::GeorefResult;
use crate::gcp::GroundControlPoint;
use crate::model::RasterSpatialModel;
use crate::raster::RasterDriver;
use crate::transformation::{
    keys, CoordinatesTransformation, ParameterCollection, ParameterValue, TransformationFactory, TransformationKind,
};
use crate::utils::config::JobConfig;
use super::resample::ResamplingMethod;
use super::suggest::SuggestedOutput;

/// Parameters owned by one process
///
/// The fitted transform is dropped whenever the target reference or the
/// source window changes and rebuilt by `rebuild_transform`.
#[derive(Debug, Clone)]
pub struct ReprojectionParameters {
    /// Transformation type name understood by the factory
    pub algorithm: String,
    pub order: u32,
    sr_wkt_in: String,
    sr_wkt_out: String,
    pub raster_model_in: Option<RasterSpatialModel>,
    pub raster_model_out: Option<RasterSpatialModel>,
    transform: Option<CoordinatesTransformation>,
    pub gcp_list_file_name: Option<PathBuf>,
    /// Output pixel count; overrides everything else
    pub width: Option<usize>,
    /// Output line count; overrides everything else
    pub height: Option<usize>,
    pub pixel_width: Option<f64>,
    pub pixel_height: Option<f64>,
    pub output_format: RasterDriver,
    pub resampling: ResamplingMethod,
    /// Source pixel/line window
    subset: Option<Subset>,
    /// 0-based source bands; empty selects all
    pub bands: Vec<usize>,
}

impl Default for ReprojectionParameters {
    fn default() -> Self {
        ReprojectionParameters {
            algorithm: TransformationKind::Polynomial.type_name().to_string(),
            order: 1,
            sr_wkt_in: String::new(),
            sr_wkt_out: String::new(),
            raster_model_in: None,
            raster_model_out: None,
            transform: None,
            gcp_list_file_name: None,
            width: None,
            height: None,
            pixel_width: None,
            pixel_height: None,
            output_format: RasterDriver::GTiff { compression: Default::default() },
            resampling: ResamplingMethod::Nearest,
            subset: None,
            bands: Vec::new(),
        }
    }
}

impl ReprojectionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sr_wkt_in(&self) -> &str {
        &self.sr_wkt_in
    }

    pub fn set_sr_wkt_in(&mut self, wkt: &str) {
        if self.sr_wkt_in != wkt {
            self.sr_wkt_in = wkt.to_string();
            self.transform = None;
        }
    }

    pub fn sr_wkt_out(&self) -> &str {
        &self.sr_wkt_out
    }

    /// Change the target reference, dropping the fitted transform
    pub fn set_sr_wkt_out(&mut self, wkt: &str) {
        if self.sr_wkt_out != wkt {
            self.sr_wkt_out = wkt.to_string();
            self.transform = None;
        }
    }

    pub fn subset(&self) -> Option<Subset> {
        self.subset
    }

    /// Change the source window, dropping the fitted transform
    pub fn set_subset(&mut self, subset: Option<Subset>) {
        if self.subset != subset {
            self.subset = subset;
            self.transform = None;
        }
    }

    pub fn transform(&self) -> Option<&CoordinatesTransformation> {
        self.transform.as_ref()
    }

    /// Create the transform through the factory from the current settings
    pub fn rebuild_transform(&mut self, gcps: &[GroundControlPoint]) -> Option<&CoordinatesTransformation> {
        let mut params = ParameterCollection::new();
        params
            .add_value(keys::SR_WKT_IN, ParameterValue::Text(self.sr_wkt_in.clone()))
            .add_value(keys::SR_WKT_OUT, ParameterValue::Text(self.sr_wkt_out.clone()))
            .add_value(keys::GCPS, ParameterValue::Gcps(gcps.to_vec()))
            .add_value(keys::ORDER, ParameterValue::Integer(self.order as i64));

        self.transform = TransformationFactory::build().create(&self.algorithm, &params);
        match &self.transform {
            Some(transform) => debug!("Rebuilt {} transform", transform.name()),
            None => warn!("No {} transform for the current parameters", self.algorithm),
        }
        self.transform.as_ref()
    }

    /// Apply the output size policy to a suggested grid
    ///
    /// Explicit counts win; a single count keeps the suggested aspect.
    /// Otherwise explicit pixel sizes recompute the counts.
    pub fn apply_size_policy(&self, suggested: &SuggestedOutput) -> SuggestedOutput {
        let aspect = suggested.height as f64 / suggested.width.max(1) as f64;
        match (self.width, self.height) {
            (Some(width), Some(height)) => suggested.with_size(width, height),
            (Some(width), None) => suggested.with_size(width, (width as f64 * aspect).round() as usize),
            (None, Some(height)) => suggested.with_size((height as f64 / aspect).round() as usize, height),
            (None, None) => match (self.pixel_width, self.pixel_height) {
                (Some(pw), Some(ph)) => suggested.with_pixel_size(pw, ph),
                (Some(size), None) | (None, Some(size)) => suggested.with_pixel_size(size, size),
                (None, None) => *suggested,
            },
        }
    }

    /// Fill unset values from a job file
    pub fn apply_job(&mut self, job: &JobConfig) -> GeorefResult<()> {
        if let Some(algorithm) = &job.algorithm {
            self.algorithm = algorithm.clone();
        }
        if let Some(order) = job.order {
            self.order = order;
        }
        if let Some(target) = &job.target_srs {
            let wkt = CoordinateSystemFactory::resolve_wkt(target)?;
            self.set_sr_wkt_out(&wkt);
        }
        self.width = self.width.or(job.width);
        self.height = self.height.or(job.height);
        self.pixel_width = self.pixel_width.or(job.pixel_width);
        self.pixel_height = self.pixel_height.or(job.pixel_height);
        if let Some(format) = &job.output_format {
            self.output_format = RasterDriver::by_name(format)?;
        }
        if let Some(resampling) = &job.resampling {
            self.resampling = ResamplingMethod::from_name(resampling)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{Coordinates, SrsCatalog};

    fn gcps() -> Vec<GroundControlPoint> {
        [(0.0, 0.0, 10.0, 20.0), (100.0, 0.0, 110.0, 20.0), (0.0, 100.0, 10.0, -80.0)]
            .iter()
            .map(|&(sx, sy, dx, dy)| GroundControlPoint::new(Coordinates::new(sx, sy), Coordinates::new(dx, dy)))
            .collect()
    }

    #[test]
    fn test_transform_dropped_on_change() {
        let mut params = ReprojectionParameters::new();
        assert!(params.rebuild_transform(&gcps()).is_some());

        params.set_subset(Some(Subset::from_corners(0.0, 0.0, 50.0, 50.0)));
        assert!(params.transform().is_none());
        params.rebuild_transform(&gcps());
        params.set_sr_wkt_out(&SrsCatalog::lookup(3857).unwrap().wkt);
        assert!(params.transform().is_none());
    }

    #[test]
    fn test_too_few_points() {
        let mut params = ReprojectionParameters::new();
        params.order = 2;
        assert!(params.rebuild_transform(&gcps()).is_none());
    }

    #[test]
    fn test_size_policy() {
        let suggested = SuggestedOutput { geotransform: [0.0, 2.0, 0.0, 100.0, 0.0, -2.0], width: 50, height: 25 };
        let mut params = ReprojectionParameters::new();
        assert_eq!(params.apply_size_policy(&suggested), suggested);

        params.pixel_width = Some(4.0);
        let sized = params.apply_size_policy(&suggested);
        assert_eq!((sized.width, sized.height), (25, 13));

        params.width = Some(10);
        let sized = params.apply_size_policy(&suggested);
        assert_eq!((sized.width, sized.height), (10, 5));
        assert_eq!(sized.geotransform[1], 10.0);
    }

    #[test]
    fn test_apply_job() {
        let job = JobConfig {
            order: Some(2),
            target_srs: Some("EPSG:4326".to_string()),
            output_format: Some("png".to_string()),
            width: Some(99),
            ..Default::default()
        };
        let mut params = ReprojectionParameters::new();
        params.width = Some(10);
        params.apply_job(&job).unwrap();
        assert_eq!(params.order, 2);
        assert_eq!(params.width, Some(10));
        assert_eq!(params.output_format, RasterDriver::Png);
        assert!(params.sr_wkt_out().starts_with("GEOGCS"));
    }
}
