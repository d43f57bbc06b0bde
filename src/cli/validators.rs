//! CLI argument validators.
//!
//! The converter accepts the same detection flags as the engine, with the
//! same bounds as the detector setting grammar.

use crate::constants::{hop_size, threshold};

/// Parse and validate a detection threshold ([0, 100]).
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let bad = || {
        format!("Bad detection threshold \"{s}\". Threshold must be a number in the range [0, 100].")
    };
    let value: f64 = s.parse().map_err(|_| bad())?;
    if !(threshold::MIN..=threshold::MAX).contains(&value) {
        return Err(bad());
    }
    Ok(value)
}

/// Parse and validate a hop size ((0, 100]).
pub fn parse_hop_size(s: &str) -> Result<f64, String> {
    let bad = || format!("Bad hop size \"{s}\". Hop size must be a number in the range (0, 100].");
    let value: f64 = s.parse().map_err(|_| bad())?;
    if value.is_nan() || value <= hop_size::MIN_EXCLUSIVE || value > hop_size::MAX {
        return Err(bad());
    }
    Ok(value)
}
