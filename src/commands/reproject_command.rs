//! Reprojection command

use std::cell::RefCell;

use clap::ArgMatches;
use log::{info, warn};

use crate::commands::command_traits::Command;
use crate::errors::GeorefResult;
use crate::warp::ReprojectionProcess;
use super::{configure_parameters, required_arg, run_with_progress};

/// Warp a georeferenced image into the reference given by --target-srs
pub struct ReprojectCommand {
    input_file: String,
    output_file: String,
    quiet: bool,
    process: RefCell<ReprojectionProcess>,
}

impl ReprojectCommand {
    pub fn new(args: &ArgMatches) -> GeorefResult<Self> {
        let input_file = required_arg(args, "input", "Missing input file")?;
        let output_file = required_arg(args, "output", "Missing output file path for reprojection")?;

        let mut process = ReprojectionProcess::new(input_file.as_str(), output_file.as_str(), "");
        configure_parameters(args, &mut process.parameters)?;
        if process.parameters.sr_wkt_out().is_empty() {
            warn!("No target reference given; the source reference is kept");
        }

        Ok(ReprojectCommand {
            input_file,
            output_file,
            quiet: args.get_flag("quiet"),
            process: RefCell::new(process),
        })
    }
}

impl Command for ReprojectCommand {
    fn execute(&self) -> GeorefResult<()> {
        info!("Reprojecting {} into {}", self.input_file, self.output_file);
        let mut process = self.process.borrow_mut();
        run_with_progress(&mut *process, "Reprojecting", self.quiet)
    }
}
