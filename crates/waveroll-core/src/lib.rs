//! Core model for the waveroll piano-roll timeline
//!
//! This crate holds everything the renderer needs that does not touch a GPU
//! or a GUI toolkit:
//!
//! - **Types**: notes, control changes, sustain segments, loop window
//! - **Transform**: the viewport model mapping time/pitch to pixels under pan/zoom
//! - **Sustain**: pedal-down interval extraction from control-change events
//! - **Onsets**: index of original note onsets used to suppress fragment markers
//! - **Peaks**: the audio peak registry and the read-only `PeakSource` trait
//! - **Config**: YAML-backed piano roll configuration
//!
//! Rendering lives in `waveroll-widgets`.

pub mod config;
pub mod error;
pub mod onsets;
pub mod peaks;
pub mod sustain;
pub mod transform;
pub mod types;

pub use config::{
    default_config_path, load_config, parse_hex_color, save_config, PianoRollConfig, Validate,
    ZoomLimits,
};
pub use error::ConfigError;
pub use onsets::{OriginalOnsets, ONSET_MATCH_EPSILON};
pub use peaks::{AudioPeakRegistry, PeakBuffers, PeakDatum, PeakSample, PeakSource, RegisteredAudio};
pub use sustain::extract_sustain_segments;
pub use transform::{
    BandLayout, LinearScale, Viewport, PIANO_KEYS_WIDTH, ZOOM_STEP_FACTOR,
};
pub use types::{
    ControlChangeEvent, HighlightMode, LoopWindow, Note, NoteInterval, NoteRange,
    OnsetMarkerShape, OnsetMarkerStyle, OnsetMarkerVariant, PatternKind, SustainSegment,
    ViewportState, SUSTAIN_CONTROLLER, SUSTAIN_THRESHOLD,
};
