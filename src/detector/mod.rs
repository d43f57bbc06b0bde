//! Vesper detector wrapper for the Nighthawk engine.
//!
//! A [`Detector`] operates on a single audio channel. It accepts a
//! sequence of consecutive sample chunks of any sizes via
//! [`detect`](Detector::detect), stages them in a temporary audio file,
//! and runs the engine on that file when
//! [`complete_detection`](Detector::complete_detection) is called. The
//! engine runs in its own conda environment, which can be different from
//! the environment the Vesper server is running in. After the engine
//! finishes, the resulting clips are streamed to the listener.

pub mod engine;
pub mod reconcile;
pub mod staging;

use std::path::PathBuf;

use tracing::info;

use crate::constants::DETECTION_FILE_SUFFIX;
use crate::error::{Error, Result};
use crate::identity::DetectorConfig;

pub use engine::{CondaRunner, EngineOutput, EngineRunner, build_engine_args, environment_name};
pub use reconcile::{Annotations, Clip, ClipListener, DetectionRow, reconcile_detections};
pub use staging::AudioStager;

/// A configured detector instance bound to one listener and one input
/// channel.
pub struct Detector<L, R = CondaRunner> {
    config: DetectorConfig,
    input_sample_rate: u32,
    listener: L,
    runner: R,
    stager: Option<AudioStager>,
}

impl<L: ClipListener> Detector<L, CondaRunner> {
    /// Create a detector that launches the engine via conda.
    pub fn new(config: DetectorConfig, input_sample_rate: u32, listener: L) -> Result<Self> {
        Self::with_runner(config, input_sample_rate, listener, CondaRunner)
    }
}

impl<L: ClipListener, R: EngineRunner> Detector<L, R> {
    /// Create a detector with an injected engine runner.
    pub fn with_runner(
        config: DetectorConfig,
        input_sample_rate: u32,
        listener: L,
        runner: R,
    ) -> Result<Self> {
        let stager = AudioStager::new(input_sample_rate)?;
        Ok(Self {
            config,
            input_sample_rate,
            listener,
            runner,
            stager: Some(stager),
        })
    }

    /// Detector configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Sample rate of the input channel in Hz.
    pub fn input_sample_rate(&self) -> u32 {
        self.input_sample_rate
    }

    /// The clip listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Stage a chunk of input samples. Chunks are concatenated in call
    /// order.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InputSealed`] once detection has completed.
    pub fn detect(&mut self, samples: &[f32]) -> Result<()> {
        self.stager
            .as_mut()
            .ok_or(Error::InputSealed)?
            .append(samples)
    }

    /// Complete detection after [`detect`](Self::detect) has been called
    /// for all input.
    ///
    /// Seals the staged audio, runs the engine against it, and streams
    /// the reconciled clips to the listener. The staged file and the
    /// engine's output directory are deleted on every exit path.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::EngineLaunch`] if the engine subprocess cannot
    /// be started and [`Error::EngineAbnormal`] if it exits nonzero; in
    /// both cases the listener receives no calls.
    pub fn complete_detection(&mut self) -> Result<()> {
        let mut stager = self.stager.take().ok_or(Error::InputSealed)?;
        stager.seal()?;

        let output_dir = tempfile::tempdir()?;

        let detector_name = self.config.display_name();
        let environment = environment_name(&self.config.version);
        let args = build_engine_args(&self.config.settings, stager.path(), output_dir.path());

        let output = self
            .runner
            .run_module(engine::engine_module(), &args, &environment)
            .map_err(|e| Error::EngineLaunch {
                detector: detector_name.clone(),
                environment: environment.clone(),
                source: e,
            })?;

        log_engine_output(&detector_name, &output);

        if !output.completed_normally() {
            return Err(Error::EngineAbnormal {
                detector: detector_name,
            });
        }

        let detection_file = detection_file_path(stager.path(), output_dir.path())?;
        reconcile_detections(&detection_file, self.input_sample_rate, &mut self.listener)
    }
}

/// Path of the engine's CSV output for the given input file.
fn detection_file_path(
    input: &std::path::Path,
    output_dir: &std::path::Path,
) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::NoFileStem {
            path: input.to_path_buf(),
        })?;
    Ok(output_dir.join(format!("{stem}{DETECTION_FILE_SUFFIX}.csv")))
}

/// Log the engine's exit status and captured output streams, line by
/// line, so the Vesper job log captures them verbatim.
fn log_engine_output(detector_name: &str, output: &EngineOutput) {
    if output.completed_normally() {
        info!("{detector_name} process completed normally.");
    } else {
        let code = output
            .status_code
            .map_or_else(|| "none".to_string(), |c| c.to_string());
        info!(
            "{detector_name} process completed abnormally with return code {code}. \
             No clips will be created."
        );
    }

    log_output_stream(detector_name, &output.stdout, "standard output");
    log_output_stream(detector_name, &output.stderr, "standard error");
}

fn log_output_stream(detector_name: &str, text: &str, stream_name: &str) {
    if text.is_empty() {
        info!("{detector_name} process {stream_name} was empty.");
    } else {
        info!("{detector_name} process {stream_name} was:");
        for line in text.trim().lines() {
            info!("    {line}");
        }
    }
}
