//! Error types for toolpath generation.
//!
//! Configuration problems are reported before any motion is produced, so a
//! failed run never leaves a partial program behind.

use crate::types::Axis;
use std::io;
use thiserror::Error;

/// Errors that can occur while building a motion program.
#[derive(Error, Debug)]
pub enum MillError {
    /// The configuration violates a range or consistency constraint.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A profile query fell outside the profile's defined domain.
    #[error("Position {position:.3} mm outside profile range {min:.3}..{max:.3} mm")]
    OutOfRange { position: f64, min: f64, max: f64 },

    /// An emitted coordinate lies outside the machine's travel.
    #[error("{axis} coordinate {value:.4} outside machine travel {min:.3}..{max:.3}")]
    TravelExceeded {
        axis: Axis,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The output stream could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration-range errors. Each variant names the parameter at fault.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Taper profile needs at least two stations, got {count}")]
    TooFewStations { count: usize },

    #[error(
        "Station {index} at {position:.3} mm does not follow previous station at {previous:.3} mm"
    )]
    StationsNotIncreasing {
        index: usize,
        previous: f64,
        position: f64,
    },

    #[error("Parameter '{name}' must not be negative (got {value})")]
    Negative { name: &'static str, value: f64 },

    #[error("Parameter '{name}' must be greater than zero (got {value})")]
    NotPositive { name: &'static str, value: f64 },

    #[error("Parameter '{name}' must be a finite number")]
    NotFinite { name: &'static str },

    #[error(
        "Tip solid {tip_solid} mm + butt solid {butt_solid} mm + one land {land_width} mm exceed rod length {length:.3} mm"
    )]
    ReservedExceedsLength {
        tip_solid: f64,
        butt_solid: f64,
        land_width: f64,
        length: f64,
    },

    #[error("Land width {land_width} mm must be smaller than land spacing {land_spacing} mm")]
    LandWiderThanSpacing { land_width: f64, land_spacing: f64 },

    #[error("Target radius '{name}' {target} mm must be smaller than blank radius {blank} mm")]
    TargetNotBelowBlank {
        name: &'static str,
        target: f64,
        blank: f64,
    },

    #[error("Polygon grip needs at least 3 faces, got {count}")]
    TooFewFaces { count: u32 },

    #[error("Finish allowance {allowance} mm exceeds the maximum bite {max_bite} mm")]
    FinishAllowanceTooLarge { allowance: f64, max_bite: f64 },
}

pub type Result<T> = std::result::Result<T, MillError>;

/// Reject NaN/infinite values and values below zero.
pub(crate) fn non_negative(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { name });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { name, value });
    }
    Ok(())
}

/// Reject NaN/infinite values and values that are zero or below.
pub(crate) fn positive(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { name });
    }
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { name, value });
    }
    Ok(())
}
