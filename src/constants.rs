//! Application-wide constants.
//!
//! Names and conventions shared with the Vesper server and the Nighthawk
//! engine are defined here so compatibility-sensitive strings live in one
//! place.

/// Application name used in user-facing messages.
pub const APP_NAME: &str = "vesper-nighthawk";

/// Detector series understood by this adapter.
pub const SUPPORTED_SERIES: &[&str] = &["Nighthawk"];

/// Python module invoked inside the engine's environment.
pub const ENGINE_MODULE: &str = "nighthawk.run_nighthawk";

/// Prefix of the engine's isolated environment name. The full name is
/// `nighthawk-<version>` and must match the environment created at engine
/// install time.
pub const ENGINE_ENV_PREFIX: &str = "nighthawk";

/// Suffix the engine appends to the input file stem to name its CSV
/// output, e.g. `recording_detections.csv`.
pub const DETECTION_FILE_SUFFIX: &str = "_detections";

/// Threshold setting bounds, inclusive on both ends.
pub mod threshold {
    /// Minimum valid threshold.
    pub const MIN: f64 = 0.0;
    /// Maximum valid threshold.
    pub const MAX: f64 = 100.0;
}

/// Hop size setting bounds: exclusive minimum, inclusive maximum.
pub mod hop_size {
    /// Exclusive lower bound.
    pub const MIN_EXCLUSIVE: f64 = 0.0;
    /// Inclusive upper bound.
    pub const MAX: f64 = 100.0;
}

/// Detector setting codes as they appear in detector name strings.
pub mod setting_codes {
    /// Merge overlapping detections.
    pub const MERGE_OVERLAPS: &str = "MO";
    /// Do not merge overlapping detections.
    pub const NO_MERGE_OVERLAPS: &str = "NMO";
    /// Drop uncertain detections.
    pub const DROP_UNCERTAIN: &str = "DU";
    /// Keep uncertain detections.
    pub const NO_DROP_UNCERTAIN: &str = "NDU";
}

/// Clip annotation names as stored by the Vesper server.
pub mod annotations {
    /// Generic detector score, in percent.
    pub const DETECTOR_SCORE: &str = "Detector Score";
    /// Vesper classification, e.g. `Call.AMRE`.
    pub const CLASSIFICATION: &str = "Classification";
    /// Classifier score, in percent.
    pub const CLASSIFIER_SCORE: &str = "Classifier Score";
    /// Predicted class label.
    pub const CLASS: &str = "Nighthawk Class";
    /// Predicted class probability.
    pub const CLASS_PROBABILITY: &str = "Nighthawk Class Probability";
    /// Taxonomic order label.
    pub const ORDER: &str = "Nighthawk Order";
    /// Taxonomic order probability.
    pub const ORDER_PROBABILITY: &str = "Nighthawk Order Probability";
    /// Taxonomic family label.
    pub const FAMILY: &str = "Nighthawk Family";
    /// Taxonomic family probability.
    pub const FAMILY_PROBABILITY: &str = "Nighthawk Family Probability";
    /// Species group label.
    pub const GROUP: &str = "Nighthawk Group";
    /// Species group probability.
    pub const GROUP_PROBABILITY: &str = "Nighthawk Group Probability";
    /// Species label.
    pub const SPECIES: &str = "Nighthawk Species";
    /// Species probability.
    pub const SPECIES_PROBABILITY: &str = "Nighthawk Species Probability";
    /// Offset added to a clip's start index to make it unique. Recorded so
    /// the correction can be undone if the uniqueness constraint is ever
    /// lifted.
    pub const START_INDEX_UNIQUENESS_OFFSET: &str = "Start Index Uniqueness Offset";
}

/// Classification annotation prefix for nocturnal flight calls.
pub const CLASSIFICATION_PREFIX: &str = "Call.";

/// Character substituted for `.` in canonical detector names.
pub const CANONICAL_NAME_DOT_SUBSTITUTE: char = 'x';
