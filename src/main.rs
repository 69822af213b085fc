use clap::{Arg, Command as ClapCommand, ArgAction};
use std::env;
use std::process;
use log::error;

use georefkit::utils::logger::{level_for, Logger};
use georefkit::commands::{CommandFactory, GeorefkitCommandFactory};

fn main() {
    let matches = ClapCommand::new("georefkit")
        .version("0.1.0")
        .about("Georeference and reproject raster images")
        .arg(
            Arg::new("input")
                .help("Input raster, or the GCP file to report on")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Do not draw a progress bar")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("georeference")
                .long("georeference")
                .help("Warp the input through a polynomial fitted to --gcp")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("reproject")
                .long("reproject")
                .help("Warp a georeferenced input into --target-srs")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("gcp")
                .short('g')
                .long("gcp")
                .help("GCP file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output raster file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Job file with a [process] table; flags override it")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .help("Polynomial order (1 to 3)")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("target-srs")
                .long("target-srs")
                .help("Target reference: EPSG code, EPSG:code or WKT")
                .value_name("SRS")
                .required(false),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .help("Output width in pixels")
                .value_name("PIXELS")
                .required(false),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .help("Output height in lines")
                .value_name("LINES")
                .required(false),
        )
        .arg(
            Arg::new("pixel-size")
                .long("pixel-size")
                .help("Output pixel size in target units")
                .value_name("SIZE")
                .required(false),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Output driver (GTiff, PNG)")
                .value_name("DRIVER")
                .required(false),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .help("GTiff compression (none, deflate, zstd)")
                .value_name("NAME")
                .required(false),
        )
        .arg(
            Arg::new("resampling")
                .short('r')
                .long("resampling")
                .help("Resampling method (nearest, bilinear)")
                .value_name("METHOD")
                .required(false),
        )
        .arg(
            Arg::new("subset")
                .long("subset")
                .help("Source pixel window (ulx,uly,lrx,lry)")
                .value_name("WINDOW")
                .required(false),
        )
        .arg(
            Arg::new("bands")
                .long("bands")
                .help("1-based source bands to keep (e.g., '3,2,1')")
                .value_name("LIST")
                .required(false),
        )
        .get_matches();

    let level = level_for(matches.get_flag("verbose"));
    if env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    } else if let Err(e) = Logger::init_global_logger("georefkit-global.log", level) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let logger = match Logger::new("georefkit.log", level) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    let factory = GeorefkitCommandFactory::new();

    match factory.create_command(&matches, &logger) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
