//! Detector settings parsing.
//!
//! The Vesper server works with detector names of the form
//!
//! ```text
//! <series name> <version number> <settings>
//! ```
//!
//! where `<settings>` is a space-delimited list of setting values, e.g.
//! `Nighthawk 0.1.0 90 20.1 NMO DU`. The server splits the name into a
//! series name, a version number, and a list of setting tokens, and
//! delegates parsing of the tokens to [`parse_settings`].

use crate::constants::{SUPPORTED_SERIES, hop_size, setting_codes, threshold};
use crate::error::SettingError;

/// Parsed detector settings.
///
/// `None` fields were not supplied and mean "use the engine default";
/// they are omitted from the engine command line and from the canonical
/// detector name.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Detection threshold in [0, 100]. Always present.
    pub threshold: f64,
    /// Hop size in (0, 100].
    pub hop_size: Option<f64>,
    /// Whether to merge overlapping detections.
    pub merge_overlaps: Option<bool>,
    /// Whether to drop uncertain detections.
    pub drop_uncertain: Option<bool>,
}

/// One parsed setting token after the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Setting {
    HopSize(f64),
    MergeOverlaps(bool),
    DropUncertain(bool),
}

/// Gets the names of the detector series supported by this adapter.
///
/// For the time being we rather naively assume that if the adapter
/// supports one detector version in a series it supports all versions in
/// the series.
pub fn supported_series() -> &'static [&'static str] {
    SUPPORTED_SERIES
}

/// Parses detector setting tokens.
///
/// The first token is the mandatory detection threshold. Each remaining
/// token is either a hop size (any token that parses as a number) or one
/// of the case-sensitive codes `MO`, `NMO`, `DU`, `NDU`. A hop size must
/// immediately follow the threshold.
///
/// If two tokens map to the same setting, the later one wins. That might
/// be considered an error, but it isn't for now.
///
/// # Errors
///
/// Returns a [`SettingError`] for an empty token list, an out-of-range or
/// non-numeric threshold, an out-of-range hop size, an out-of-place hop
/// size, or an unrecognized token.
pub fn parse_settings(
    _series_name: &str,
    _version: &str,
    tokens: &[&str],
) -> Result<Settings, SettingError> {
    let (first, rest) = tokens.split_first().ok_or(SettingError::MissingThreshold)?;

    let threshold = parse_threshold(first)?;

    let parsed = rest
        .iter()
        .map(|token| parse_setting(token))
        .collect::<Result<Vec<_>, _>>()?;

    // A hop size is only valid directly after the threshold.
    if let Some(index) = parsed
        .iter()
        .position(|s| matches!(s, Setting::HopSize(_)))
        && index != 0
    {
        return Err(SettingError::HopSizeOutOfPlace {
            value: rest[index].to_string(),
        });
    }

    let mut settings = Settings {
        threshold,
        hop_size: None,
        merge_overlaps: None,
        drop_uncertain: None,
    };

    for setting in parsed {
        match setting {
            Setting::HopSize(value) => settings.hop_size = Some(value),
            Setting::MergeOverlaps(value) => settings.merge_overlaps = Some(value),
            Setting::DropUncertain(value) => settings.drop_uncertain = Some(value),
        }
    }

    Ok(settings)
}

fn parse_threshold(token: &str) -> Result<f64, SettingError> {
    let bad = || SettingError::BadThreshold {
        value: token.to_string(),
    };
    let value: f64 = token.parse().map_err(|_| bad())?;
    if !(threshold::MIN..=threshold::MAX).contains(&value) {
        return Err(bad());
    }
    Ok(value)
}

fn parse_setting(token: &str) -> Result<Setting, SettingError> {
    if token.parse::<f64>().is_ok() {
        return parse_hop_size(token).map(Setting::HopSize);
    }

    match token {
        setting_codes::MERGE_OVERLAPS => Ok(Setting::MergeOverlaps(true)),
        setting_codes::NO_MERGE_OVERLAPS => Ok(Setting::MergeOverlaps(false)),
        setting_codes::DROP_UNCERTAIN => Ok(Setting::DropUncertain(true)),
        setting_codes::NO_DROP_UNCERTAIN => Ok(Setting::DropUncertain(false)),
        _ => Err(SettingError::UnrecognizedValue {
            value: token.to_string(),
        }),
    }
}

fn parse_hop_size(token: &str) -> Result<f64, SettingError> {
    let bad = || SettingError::BadHopSize {
        value: token.to_string(),
    };
    let value: f64 = token.parse().map_err(|_| bad())?;
    if value.is_nan() || value <= hop_size::MIN_EXCLUSIVE || value > hop_size::MAX {
        return Err(bad());
    }
    Ok(value)
}
