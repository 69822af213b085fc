//! Georeference and reprojection processes
//!
//! Both run in two phases. Translate windows the source to the requested
//! pixel subset and bands, attaches the georeferencing and materializes
//! the result to a temporary GeoTIFF. Warp reopens that file, builds the
//! image transformer, suggests the output grid and resamples every band
//! into the output file. Preconditions are checked before anything is
//! written.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use tempfile::NamedTempFile;

use crate::coordinate::{Coordinates, Subset};
use crate::errors::{GeorefError, GeorefResult};
use crate::gcp::{GroundControlPoint, TextFileGcpLoader};
use crate::model::RasterSpatialModel;
use crate::raster::{Dataset, RasterDriver};
use crate::transformation::{minimum_gcps, TransformationKind};
use super::engine::{warp, WarpOptions};
use super::history::{keys, ProcessHistory, GEOREFERENCE_PROCESS, REPROJECTION_PROCESS};
use super::parameters::ReprojectionParameters;
use super::suggest::suggest_output;
use super::transformer::ImageTransformer;

/// Share of the progress range given to the translate phase
const TRANSLATE_SHARE: f64 = 0.1;

/// A runnable process
pub trait Process {
    /// Run to completion, reporting progress in [0, 1]
    fn run(&mut self, progress: &mut dyn FnMut(f64)) -> GeorefResult<()>;

    /// Run without progress reporting; errors are logged
    fn execute(&mut self) -> bool {
        match self.run(&mut |_| {}) {
            Ok(()) => true,
            Err(e) => {
                error!("Process failed: {}", e);
                false
            }
        }
    }
}

/// Warp an image through a polynomial fitted to a GCP file
pub struct GeoreferenceProcess {
    source: PathBuf,
    output: PathBuf,
    pub parameters: ReprojectionParameters,
}

impl GeoreferenceProcess {
    pub fn new<P: AsRef<Path>>(source: P, output: P, gcp_file: P) -> Self {
        let mut parameters = ReprojectionParameters::new();
        parameters.gcp_list_file_name = Some(gcp_file.as_ref().to_path_buf());
        GeoreferenceProcess {
            source: source.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            parameters,
        }
    }
}

impl Process for GeoreferenceProcess {
    fn run(&mut self, progress: &mut dyn FnMut(f64)) -> GeorefResult<()> {
        let params = &mut self.parameters;
        check_output_driver(params.output_format)?;

        let gcp_file = params.gcp_list_file_name.clone()
            .ok_or_else(|| GeorefError::Config("No GCP file given".to_string()))?;
        let list = TextFileGcpLoader::load(&gcp_file)?;
        let gcps = list.adapted_points();
        let required = minimum_gcps(params.order);
        if gcps.len() < required {
            return Err(GeorefError::Transformation(format!(
                "Order {} needs at least {} enabled control points, {} found", params.order, required, gcps.len())));
        }

        // GCP destinations stay in the reference the file declares
        let gcp_srs = if list.destination_srs_wkt.trim().is_empty() {
            params.sr_wkt_out().to_string()
        } else {
            list.destination_srs_wkt.clone()
        };
        if params.sr_wkt_out().is_empty() {
            params.set_sr_wkt_out(&gcp_srs);
        }
        params.set_sr_wkt_in(&list.source_srs_wkt);
        let algorithm = params.algorithm.clone();
        let rmse = params.rebuild_transform(&gcps)
            .ok_or_else(|| GeorefError::Transformation(format!(
                "Cannot create a {} transformation from {} control points", algorithm, gcps.len())))?
            .rmse();
        info!("Fitted order {} polynomial, RMSE {:.6}", params.order, rmse);

        let source = RasterDriver::open(&self.source)?;

        let mut history = ProcessHistory::new(GEOREFERENCE_PROCESS);
        history.set(keys::TRANSFORMATION, &params.algorithm)
            .set(keys::ORDER, params.order)
            .set(keys::GCP_FILE, gcp_file.display())
            .set(keys::RMSE, rmse);

        let translated = translate(&source, params, Some((&gcps, gcp_srs.as_str())))?;
        progress(TRANSLATE_SHARE);
        warp_phase(&translated, params, history, &self.output, progress)
    }
}

/// Warp a georeferenced image into another spatial reference
pub struct ReprojectionProcess {
    source: PathBuf,
    output: PathBuf,
    pub parameters: ReprojectionParameters,
}

impl ReprojectionProcess {
    pub fn new<P: AsRef<Path>>(source: P, output: P, target_srs_wkt: &str) -> Self {
        let mut parameters = ReprojectionParameters::new();
        parameters.algorithm = TransformationKind::Exact.type_name().to_string();
        parameters.set_sr_wkt_out(target_srs_wkt);
        ReprojectionProcess {
            source: source.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            parameters,
        }
    }
}

impl Process for ReprojectionProcess {
    fn run(&mut self, progress: &mut dyn FnMut(f64)) -> GeorefResult<()> {
        let params = &mut self.parameters;
        check_output_driver(params.output_format)?;

        let source = RasterDriver::open(&self.source)?;
        let model = source.spatial_model().ok_or_else(|| GeorefError::Raster(format!(
            "{} has no usable geotransform", self.source.display())))?;
        params.raster_model_in = Some(model);
        params.set_sr_wkt_in(&source.srs_wkt);
        if params.sr_wkt_out().is_empty() {
            let source_srs = params.sr_wkt_in().to_string();
            params.set_sr_wkt_out(&source_srs);
        }
        params.rebuild_transform(&[]).ok_or_else(|| GeorefError::Transformation(
            "No exact transformation between the source and target reference systems".to_string()))?;

        let mut history = ProcessHistory::new(REPROJECTION_PROCESS);
        history.set(keys::TRANSFORMATION, &params.algorithm)
            .set(keys::TARGET_SRS, params.sr_wkt_out());

        let translated = translate(&source, params, None)?;
        progress(TRANSLATE_SHARE);
        warp_phase(&translated, params, history, &self.output, progress)
    }
}

fn check_output_driver(driver: RasterDriver) -> GeorefResult<()> {
    if driver == RasterDriver::Mem {
        return Err(GeorefError::UnsupportedDriver("MEM cannot be used as an output format".to_string()));
    }
    if !driver.is_georeferenced() {
        warn!("{} output will not keep georeferencing", driver.name());
    }
    Ok(())
}

/// Pixel window (x_off, y_off, width, height) of a subset, clipped to the raster
fn pixel_window(subset: &Subset, width: usize, height: usize) -> GeorefResult<(usize, usize, usize, usize)> {
    let subset = subset.normalized();
    let x0 = subset.min_x().floor().max(0.0) as usize;
    let y0 = subset.min_y().floor().max(0.0) as usize;
    let x1 = (subset.max_x().ceil().max(0.0) as usize).min(width);
    let y1 = (subset.max_y().ceil().max(0.0) as usize).min(height);
    if x1 <= x0 || y1 <= y0 {
        return Err(GeorefError::Raster(format!("Subset {:?} does not overlap the raster", subset)));
    }
    Ok((x0, y0, x1 - x0, y1 - y0))
}

/// Phase 1: window, attach georeferencing, materialize to a temporary GeoTIFF
fn translate(
    source: &Dataset,
    params: &ReprojectionParameters,
    gcps: Option<(&[GroundControlPoint], &str)>,
) -> GeorefResult<NamedTempFile> {
    let (x_off, y_off, width, height) = match params.subset() {
        Some(subset) => pixel_window(&subset, source.width(), source.height())?,
        None => (0, 0, source.width(), source.height()),
    };
    let mut translated = source.window(x_off, y_off, width, height, &params.bands)?;

    if let Some((gcps, srs)) = gcps {
        let shifted = gcps.iter()
            .map(|gcp| {
                let s = gcp.source();
                GroundControlPoint::new(Coordinates::new(s.x - x_off as f64, s.y - y_off as f64), gcp.destination())
            })
            .collect();
        translated.clear_geotransform();
        translated.set_gcps(shifted, srs);
    }

    let temp = tempfile::Builder::new().prefix("georefkit-").suffix(".tif").tempfile()?;
    info!("Translating {}x{} window at ({}, {}) to {}", width, height, x_off, y_off, temp.path().display());
    RasterDriver::by_name("GTiff")?.create_copy(&translated, temp.path())?;
    Ok(temp)
}

/// Phase 2: warp the translated file into the output
fn warp_phase(
    translated: &NamedTempFile,
    params: &mut ReprojectionParameters,
    mut history: ProcessHistory,
    output_path: &Path,
    progress: &mut dyn FnMut(f64),
) -> GeorefResult<()> {
    let source = RasterDriver::open(translated.path())?;
    let transformer = ImageTransformer::for_dataset(&source, params.sr_wkt_out(), params.order)?;

    let suggested = suggest_output(&transformer, source.width(), source.height())?;
    let output = params.apply_size_policy(&suggested);
    params.raster_model_out = RasterSpatialModel::from_geotransform(output.geotransform);

    let options = WarpOptions { resampling: params.resampling, ..WarpOptions::default() };
    let mut warp_progress = |fraction: f64| progress(TRANSLATE_SHARE + (1.0 - TRANSLATE_SHARE) * fraction);
    let mut warped = warp(&source, &transformer, &output, &options, &mut warp_progress)?;

    let (min_x, min_y, max_x, max_y) = output.extent();
    history.set(keys::PIXELS, output.width)
        .set(keys::LINES, output.height)
        .set(keys::PIXEL_WIDTH, output.geotransform[1])
        .set(keys::PIXEL_HEIGHT, -output.geotransform[5]);
    history.subset = Some(Subset::from_corners(min_x, max_y, max_x, min_y));
    warped.metadata = source.metadata.clone();
    history.attach(&mut warped)?;

    params.output_format.create_copy(&warped, output_path)?;
    progress(1.0);
    info!("Wrote {}x{} output to {}", output.width, output.height, output_path.display());
    Ok(())
}
