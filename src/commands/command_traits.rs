//! Command pattern interfaces

use crate::errors::GeorefResult;
use crate::utils::logger::Logger;

/// An executable command line operation
pub trait Command {
    fn execute(&self) -> GeorefResult<()>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory<'a> {
    /// Create the command selected by the arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Report log shared by the commands
    fn create_command(&self, args: &clap::ArgMatches, logger: &'a Logger) -> GeorefResult<Box<dyn Command + 'a>>;
}
