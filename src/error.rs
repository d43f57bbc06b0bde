//! Error types for vesper-nighthawk.

/// Result type alias for vesper-nighthawk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error raised while parsing detector settings.
///
/// Setting errors surface synchronously at configuration time, before any
/// audio is staged, and are never retried. The messages are part of the
/// detector provider contract with the Vesper server and must not change
/// casually.
#[derive(Debug, thiserror::Error)]
pub enum SettingError {
    /// The settings token sequence was empty.
    #[error("No threshold specified.")]
    MissingThreshold,

    /// The threshold token was not a number in [0, 100].
    #[error("Bad threshold \"{value}\". Threshold must be a number in the range [0, 100].")]
    BadThreshold {
        /// The offending token, verbatim.
        value: String,
    },

    /// A hop size token was not a number in (0, 100].
    #[error("Bad hop size \"{value}\". Hop size must be a number in the range (0, 100].")]
    BadHopSize {
        /// The offending token, verbatim.
        value: String,
    },

    /// A token matched neither a number nor a known setting code.
    #[error("Unrecognized detector setting value \"{value}\".")]
    UnrecognizedValue {
        /// The offending token, verbatim.
        value: String,
    },

    /// A numeric token appeared after non-numeric settings.
    #[error(
        "Hop size \"{value}\" specified out of place. Hop size must immediately follow threshold."
    )]
    HopSizeOutOfPlace {
        /// The offending token, verbatim.
        value: String,
    },
}

/// Top-level error type for vesper-nighthawk.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Detector settings could not be parsed.
    #[error(transparent)]
    Setting(#[from] SettingError),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create the staged detector input file.
    #[error("failed to create detector input file")]
    InputCreate {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write staged audio samples.
    #[error("failed to write detector input file '{path}'")]
    InputWrite {
        /// Path to the staged audio file.
        path: std::path::PathBuf,
        /// Underlying WAV error.
        #[source]
        source: hound::Error,
    },

    /// `detect` or `complete_detection` was called after the staged input
    /// was sealed.
    #[error("detector input is sealed; detection has already been completed")]
    InputSealed,

    /// The engine subprocess could not be launched at all. Distinct from
    /// the engine running and exiting nonzero.
    #[error(
        "Could not run {detector} in environment \"{environment}\". Error message was: {source}"
    )]
    EngineLaunch {
        /// Human-readable detector name.
        detector: String,
        /// Name of the isolated environment.
        environment: String,
        /// Underlying launch error.
        #[source]
        source: std::io::Error,
    },

    /// The engine subprocess ran but completed abnormally.
    #[error("{detector} process completed abnormally. See above log messages for details.")]
    EngineAbnormal {
        /// Human-readable detector name.
        detector: String,
    },

    /// Failed to open the engine's detection CSV file.
    #[error("failed to open detection file '{path}'")]
    DetectionOpen {
        /// Path to the detection file.
        path: std::path::PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A detection CSV record could not be parsed.
    #[error("invalid detection file format: {message}")]
    DetectionFormat {
        /// Description of the format error.
        message: String,
    },

    /// Failed to open an audio file for reading.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying WAV error.
        #[source]
        source: hound::Error,
    },

    /// Failed to write a JSON detections file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Input file path has no usable file stem.
    #[error("input file path has no file stem: {path}")]
    NoFileStem {
        /// The offending path.
        path: std::path::PathBuf,
    },
}
