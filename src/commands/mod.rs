//! CLI command implementations
//!
//! Each command is created from the parsed arguments by the
//! `GeorefkitCommandFactory` and run through the `Command` trait.

pub mod command_traits;
pub mod georeference_command;
pub mod reproject_command;
pub mod info_command;

pub use command_traits::{Command, CommandFactory};
pub use georeference_command::GeoreferenceCommand;
pub use reproject_command::ReprojectCommand;
pub use info_command::InfoCommand;

use std::str::FromStr;

use clap::ArgMatches;
use log::info;

use crate::compression::Compression;
use crate::coordinate::{CoordinateSystemFactory, Subset};
use crate::errors::{GeorefError, GeorefResult};
use crate::raster::RasterDriver;
use crate::utils::config::JobConfig;
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;
use crate::warp::{Process, ReprojectionParameters, ResamplingMethod};

/// Factory for creating command instances based on CLI arguments
pub struct GeorefkitCommandFactory;

impl GeorefkitCommandFactory {
    pub fn new() -> Self {
        GeorefkitCommandFactory
    }
}

impl Default for GeorefkitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for GeorefkitCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> GeorefResult<Box<dyn Command + 'a>> {
        if args.get_flag("georeference") && args.get_flag("reproject") {
            return Err(GeorefError::GenericError("--georeference and --reproject cannot be combined".to_string()));
        }
        if args.get_flag("georeference") {
            Ok(Box::new(GeoreferenceCommand::new(args)?))
        } else if args.get_flag("reproject") {
            Ok(Box::new(ReprojectCommand::new(args)?))
        } else {
            Ok(Box::new(InfoCommand::new(args, logger)?))
        }
    }
}

pub(crate) fn required_arg(args: &ArgMatches, name: &str, message: &str) -> GeorefResult<String> {
    args.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| GeorefError::GenericError(message.to_string()))
}

pub(crate) fn parse_arg<T: FromStr>(args: &ArgMatches, name: &str) -> GeorefResult<Option<T>> {
    match args.get_one::<String>(name) {
        None => Ok(None),
        Some(text) => text.trim().parse::<T>()
            .map(Some)
            .map_err(|_| GeorefError::GenericError(format!("Invalid value for --{}: {}", name, text))),
    }
}

/// Parse a 1-based band list such as "3,2,1"
pub(crate) fn parse_bands(text: &str) -> GeorefResult<Vec<usize>> {
    text.split(',')
        .map(|part| match part.trim().parse::<usize>() {
            Ok(band) if band > 0 => Ok(band - 1),
            _ => Err(GeorefError::GenericError(format!("Invalid band number: {}", part.trim()))),
        })
        .collect()
}

/// Fill process parameters from the job file, then from the flags
pub(crate) fn configure_parameters(args: &ArgMatches, params: &mut ReprojectionParameters) -> GeorefResult<()> {
    if let Some(config) = args.get_one::<String>("config") {
        params.apply_job(&JobConfig::load(config)?)?;
    }

    if let Some(order) = parse_arg::<u32>(args, "order")? {
        params.order = order;
    }
    if let Some(target) = args.get_one::<String>("target-srs") {
        let wkt = CoordinateSystemFactory::resolve_wkt(target)?;
        params.set_sr_wkt_out(&wkt);
    }
    if let Some(width) = parse_arg::<usize>(args, "width")? {
        params.width = Some(width);
    }
    if let Some(height) = parse_arg::<usize>(args, "height")? {
        params.height = Some(height);
    }
    if let Some(size) = parse_arg::<f64>(args, "pixel-size")? {
        params.pixel_width = Some(size);
        params.pixel_height = Some(size);
    }
    if let Some(format) = args.get_one::<String>("format") {
        params.output_format = RasterDriver::by_name(format)?;
    }
    if let Some(name) = args.get_one::<String>("compression") {
        let compression = Compression::by_name(name)?;
        match params.output_format {
            RasterDriver::GTiff { .. } => params.output_format = RasterDriver::GTiff { compression },
            other => return Err(GeorefError::Config(format!("{} output does not take a compression", other))),
        }
    }
    if let Some(name) = args.get_one::<String>("resampling") {
        params.resampling = ResamplingMethod::from_name(name)?;
    }
    if let Some(subset) = args.get_one::<String>("subset") {
        let subset = Subset::from_string(subset).map_err(GeorefError::GenericError)?;
        params.set_subset(Some(subset));
    }
    if let Some(bands) = args.get_one::<String>("bands") {
        params.bands = parse_bands(bands)?;
    }
    Ok(())
}

/// Run a process, drawing its progress unless quiet
pub(crate) fn run_with_progress(process: &mut dyn Process, description: &str, quiet: bool) -> GeorefResult<()> {
    let tracker = if quiet { ProgressTracker::hidden() } else { ProgressTracker::new(description) };
    process.run(&mut |fraction| tracker.update(fraction))?;
    tracker.finish();
    info!("{} finished", description);
    Ok(())
}
