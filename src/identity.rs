//! Detector configuration identity.
//!
//! The Vesper server caches detector classes by name, so every distinct
//! configuration must map to a distinct, deterministic identifier. The
//! canonical name concatenates the series, version, and each present
//! setting in a fixed order, then replaces `.` with `x` so the result is
//! usable as a bare identifier:
//!
//! ```text
//! detector name:  Nighthawk 0.1.0 90 20.1 NMO DU
//! canonical name: Nighthawk_0x1x0_90_20x1_NMO_DU
//! ```

use crate::constants::{CANONICAL_NAME_DOT_SUBSTITUTE, setting_codes};
use crate::settings::Settings;

/// Identity tuple of a fully configured detector. Immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Detector series name, e.g. `Nighthawk`.
    pub series_name: String,
    /// Detector version number, e.g. `0.1.0`.
    pub version: String,
    /// Parsed detector settings.
    pub settings: Settings,
}

impl DetectorConfig {
    /// Create a configuration from a series name, version number, and
    /// parsed settings.
    #[must_use]
    pub fn new(series_name: &str, version: &str, settings: Settings) -> Self {
        Self {
            series_name: series_name.to_string(),
            version: version.to_string(),
            settings,
        }
    }

    /// Derive the canonical detector name for this configuration.
    ///
    /// The name is a pure function of the configuration: equal settings
    /// always yield equal names, within a process and across processes,
    /// and distinct settings never collide.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        let settings = &self.settings;

        let name = format!(
            "{}_{}{}{}{}{}",
            self.series_name,
            self.version,
            format_number(Some(settings.threshold)),
            format_number(settings.hop_size),
            format_boolean(settings.merge_overlaps, setting_codes::MERGE_OVERLAPS),
            format_boolean(settings.drop_uncertain, setting_codes::DROP_UNCERTAIN),
        );

        name.replace('.', &CANONICAL_NAME_DOT_SUBSTITUTE.to_string())
    }

    /// Human-readable detector name, e.g. `Nighthawk 0.1.0 90 20.1 NMO DU`.
    /// Used in log messages and error text.
    #[must_use]
    pub fn display_name(&self) -> String {
        let settings = &self.settings;

        let mut name = format!(
            "{} {} {}",
            self.series_name, self.version, settings.threshold
        );

        if let Some(hop_size) = settings.hop_size {
            name.push_str(&format!(" {hop_size}"));
        }
        if let Some(merge) = settings.merge_overlaps {
            name.push(' ');
            name.push_str(&boolean_code(merge, setting_codes::MERGE_OVERLAPS));
        }
        if let Some(drop) = settings.drop_uncertain {
            name.push(' ');
            name.push_str(&boolean_code(drop, setting_codes::DROP_UNCERTAIN));
        }

        name
    }
}

fn format_number(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("_{v}"))
}

fn format_boolean(value: Option<bool>, code: &str) -> String {
    value.map_or_else(String::new, |v| format!("_{}", boolean_code(v, code)))
}

fn boolean_code(value: bool, code: &str) -> String {
    if value {
        code.to_string()
    } else {
        format!("N{code}")
    }
}
