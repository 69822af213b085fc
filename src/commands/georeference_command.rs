//! Georeference command
//!
//! Warps an image through a polynomial fitted to the enabled points of a
//! GCP file.

use std::cell::RefCell;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::errors::GeorefResult;
use crate::warp::GeoreferenceProcess;
use super::{configure_parameters, required_arg, run_with_progress};

pub struct GeoreferenceCommand {
    input_file: String,
    output_file: String,
    gcp_file: String,
    quiet: bool,
    process: RefCell<GeoreferenceProcess>,
}

impl GeoreferenceCommand {
    pub fn new(args: &ArgMatches) -> GeorefResult<Self> {
        let input_file = required_arg(args, "input", "Missing input file")?;
        let output_file = required_arg(args, "output", "Missing output file path for georeferencing")?;
        let gcp_file = required_arg(args, "gcp", "Missing GCP file. Use --gcp")?;

        let mut process = GeoreferenceProcess::new(input_file.as_str(), output_file.as_str(), gcp_file.as_str());
        configure_parameters(args, &mut process.parameters)?;

        Ok(GeoreferenceCommand {
            input_file,
            output_file,
            gcp_file,
            quiet: args.get_flag("quiet"),
            process: RefCell::new(process),
        })
    }
}

impl Command for GeoreferenceCommand {
    fn execute(&self) -> GeorefResult<()> {
        info!("Georeferencing {} with {} into {}", self.input_file, self.gcp_file, self.output_file);
        let mut process = self.process.borrow_mut();
        run_with_progress(&mut *process, "Georeferencing", self.quiet)
    }
}
