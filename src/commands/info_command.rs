//! GCP file report command
//!
//! Loads a GCP file into a `GcpDriver`, fits the polynomial and reports
//! the table with its error columns together with the RMSE.

use clap::ArgMatches;
use log::{info, warn};

use crate::commands::command_traits::Command;
use crate::driver::{DriverLayout, GcpDriver};
use crate::errors::GeorefResult;
use crate::gcp::{GcpList, TextFileGcpLoader};
use crate::transformation::DEFAULT_ORDER;
use crate::utils::logger::Logger;
use super::{parse_arg, required_arg};

pub struct InfoCommand<'a> {
    gcp_file: String,
    order: u32,
    /// Report log for the residual table
    logger: &'a Logger,
}

impl<'a> InfoCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> GeorefResult<Self> {
        let gcp_file = match args.get_one::<String>("gcp") {
            Some(file) => file.clone(),
            None => required_arg(args, "input", "Missing GCP file")?,
        };
        let order = parse_arg::<u32>(args, "order")?.unwrap_or(DEFAULT_ORDER);

        Ok(InfoCommand {
            gcp_file,
            order,
            logger,
        })
    }

    /// Map layout when the file names a destination reference
    fn layout_for(list: &GcpList) -> DriverLayout {
        if list.destination_srs_wkt.trim().is_empty() {
            DriverLayout::Coregister
        } else {
            DriverLayout::Georeference
        }
    }

    fn report(&self, line: &str) {
        info!("{}", line);
        if let Err(e) = self.logger.write_line(line) {
            warn!("Cannot write report line: {}", e);
        }
    }

    fn report_table(&self, driver: &GcpDriver) {
        let header: Vec<&str> = (0..driver.column_count())
            .map(|c| driver.column_name(c).unwrap_or(""))
            .collect();
        self.report(&header.join("\t"));

        for row in 0..driver.row_count() {
            let cells: Vec<&str> = (0..driver.column_count())
                .map(|c| driver.cell(row, c).unwrap_or(""))
                .collect();
            self.report(&cells.join("\t"));
        }
    }
}

impl<'a> Command for InfoCommand<'a> {
    fn execute(&self) -> GeorefResult<()> {
        let list = TextFileGcpLoader::load(&self.gcp_file)?;
        self.report(&format!("GCP file: {}", self.gcp_file));
        self.report(&format!("  Points: {} ({} enabled)", list.len(), list.enabled_count()));
        if !list.transformation_name.is_empty() {
            self.report(&format!("  Transformation: {} {}", list.transformation_name, list.transformation_parameters));
        }

        let mut driver = GcpDriver::new(Self::layout_for(&list), self.order);
        driver.load_gcps(&list);
        self.report_table(&driver);

        match driver.transformation().and_then(|t| t.as_polynomial()) {
            Some(polynomial) => {
                for (index, (dx, dy)) in polynomial.residuals().iter().enumerate() {
                    self.report(&format!("  Residual {}: {:.6} {:.6}", index + 1, dx, dy));
                }
                self.report(&format!("  Order {} RMSE: {:.6}", self.order, driver.rmse()));
            }
            None => warn!("No order {} polynomial could be fitted to {} enabled points",
                          self.order, list.enabled_count()),
        }
        Ok(())
    }
}
