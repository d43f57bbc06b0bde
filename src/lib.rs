//! Vesper detector adapter for the Nighthawk nocturnal flight call
//! detector.
//!
//! This crate lets the Vesper server run the external Nighthawk engine as
//! a subprocess and translate its detection output into Vesper clips. The
//! adapter performs no detection itself: it parses detector setting
//! strings into configurations with canonical identities, stages streamed
//! samples into a temporary audio file, launches the engine in its
//! isolated environment, and reconciles the engine's CSV output into
//! clips with unique start indices.
//!
//! The crate also ships a small binary that converts engine detection CSV
//! files into Vesper JSON detection documents.

#![warn(missing_docs)]

pub mod cli;
pub mod constants;
pub mod convert;
pub mod detector;
pub mod error;
pub mod identity;
pub mod settings;

use clap::Parser;
use tracing::info;

pub use error::{Error, Result, SettingError};

/// Main entry point for the converter CLI.
pub fn run() -> Result<()> {
    let cli = cli::Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let summary = convert::convert_detections(&cli.input_file, cli.output_dir.as_deref())?;

    info!(
        "Wrote {} detection(s) to {}",
        summary.detection_count,
        summary.json_path.display()
    );

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).init();
}
