//! CLI argument parsing for the converter binary.

mod args;
pub mod validators;

pub use args::Cli;
