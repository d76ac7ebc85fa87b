//! Error types for configuration handling

use thiserror::Error;

/// Validation failures for [`PianoRollConfig`](crate::PianoRollConfig)
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("time step must be a positive finite number, got {0}")]
    InvalidTimeStep(f64),

    #[error("note range {min}..={max} is empty or exceeds the MIDI range")]
    InvalidNoteRange { min: u8, max: u8 },

    #[error("zoom limits must satisfy 0 < min <= max (got {min}..={max})")]
    InvalidZoomRange { min: f64, max: f64 },

    #[error("viewport size must be positive (got {width}x{height})")]
    InvalidViewport { width: f64, height: f64 },

    #[error("invalid hex color: {0}")]
    InvalidColor(String),
}
