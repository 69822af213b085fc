//! Utility modules shared by the library and the command line

pub mod config;
pub mod logger;
pub mod progress;
pub mod wkt;
