//! Engine subprocess invocation.
//!
//! Nighthawk runs in its own conda environment, which can be different
//! from the environment the Vesper server is running in. The
//! [`EngineRunner`] trait is the seam between the detector and the
//! process launcher, so tests can substitute a fake engine.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Command;

use crate::constants::{ENGINE_ENV_PREFIX, ENGINE_MODULE};
use crate::settings::Settings;

/// Captured outcome of one engine run.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Process exit code. `None` if the process was terminated by a
    /// signal; treated as abnormal completion.
    pub status_code: Option<i32>,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl EngineOutput {
    /// Whether the engine process completed normally.
    #[must_use]
    pub fn completed_normally(&self) -> bool {
        self.status_code == Some(0)
    }
}

/// Capability to run a Python module in a named isolated environment.
pub trait EngineRunner {
    /// Run `module` with `args` in the environment `environment`,
    /// blocking until it exits, and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be launched at all;
    /// a nonzero exit is reported through [`EngineOutput`].
    fn run_module(
        &self,
        module: &str,
        args: &[OsString],
        environment: &str,
    ) -> io::Result<EngineOutput>;
}

/// Production [`EngineRunner`] that launches the module via `conda run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CondaRunner;

impl EngineRunner for CondaRunner {
    fn run_module(
        &self,
        module: &str,
        args: &[OsString],
        environment: &str,
    ) -> io::Result<EngineOutput> {
        let output = Command::new("conda")
            .args(["run", "-n", environment, "python", "-m", module])
            .args(args)
            .output()?;

        Ok(EngineOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Name of the isolated environment for an engine version. The convention
/// `nighthawk-<version>` must match the environment created at engine
/// install time.
#[must_use]
pub fn environment_name(version: &str) -> String {
    format!("{ENGINE_ENV_PREFIX}-{version}")
}

/// Name of the module run inside the engine environment.
#[must_use]
pub fn engine_module() -> &'static str {
    ENGINE_MODULE
}

/// Build the engine command-line argument vector from settings.
///
/// Flags appear only for settings that were supplied, in a fixed order:
/// hop size, threshold, merge-overlaps, drop-uncertain, output directory,
/// then the positional input path.
#[must_use]
pub fn build_engine_args(settings: &Settings, input: &Path, output_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    if let Some(hop_size) = settings.hop_size {
        args.push("--hop-size".into());
        args.push(hop_size.to_string().into());
    }

    args.push("--threshold".into());
    args.push(settings.threshold.to_string().into());

    if let Some(merge) = settings.merge_overlaps {
        let flag = if merge {
            "--merge-overlaps"
        } else {
            "--no-merge-overlaps"
        };
        args.push(flag.into());
    }

    if let Some(drop) = settings.drop_uncertain {
        let flag = if drop {
            "--drop-uncertain"
        } else {
            "--no-drop-uncertain"
        };
        args.push(flag.into());
    }

    args.push("--output-dir".into());
    args.push(output_dir.into());

    args.push(input.into());

    args
}
