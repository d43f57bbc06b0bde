//! CLI argument definitions.

use clap::Parser;
use std::path::PathBuf;

use super::validators::{parse_hop_size, parse_threshold};
use crate::constants::APP_NAME;

/// Convert Nighthawk detection CSV files to Vesper JSON detection files.
///
/// Accepts the engine's detection flags for command-line compatibility;
/// conversion itself uses only the input file and the output directory.
#[derive(Debug, Parser)]
#[command(name = APP_NAME)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the audio file on which the detector was run.
    pub input_file: PathBuf,

    /// Hop size, a number in the range (0, 100].
    #[arg(long, value_parser = parse_hop_size)]
    pub hop_size: Option<f64>,

    /// Detection threshold, a number in the range [0, 100].
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Merge overlapping detections.
    #[arg(long, overrides_with = "no_merge_overlaps")]
    pub merge_overlaps: bool,

    /// Do not merge overlapping detections.
    #[arg(long, overrides_with = "merge_overlaps")]
    pub no_merge_overlaps: bool,

    /// Drop uncertain detections.
    #[arg(long, overrides_with = "no_drop_uncertain")]
    pub drop_uncertain: bool,

    /// Keep uncertain detections.
    #[arg(long, overrides_with = "drop_uncertain")]
    pub no_drop_uncertain: bool,

    /// Directory containing the detection CSV file and receiving the JSON
    /// file (default: the input file's directory).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Suppress informational output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
