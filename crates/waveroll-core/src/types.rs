//! Shared data types for the piano roll timeline
//!
//! Notes and control changes come from an external provider and are treated as
//! read-only here. Everything else is either derived per render pass
//! (`SustainSegment`) or owned by the engine (`ViewportState`, `LoopWindow`).

use serde::{Deserialize, Serialize};

/// MIDI controller number of the sustain (damper) pedal
pub const SUSTAIN_CONTROLLER: u8 = 64;

/// Normalized controller value at or above which the pedal counts as down
pub const SUSTAIN_THRESHOLD: f32 = 0.5;

// =============================================================================
// External entities
// =============================================================================

/// A single note of one source file
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Onset in seconds (for split fragments, the fragment start)
    pub time: f64,
    /// Length in seconds
    pub duration: f64,
    /// MIDI pitch (0-127)
    pub midi: u8,
    /// Normalized velocity (0.0 to 1.0)
    pub velocity: f32,
    /// Source file / track identifier
    pub file_id: String,
    /// Index of the note in its source file, shared by all fragments of a split note
    pub source_index: Option<u32>,
}

impl Note {
    pub fn new(time: f64, duration: f64, midi: u8, file_id: impl Into<String>) -> Self {
        Self {
            time,
            duration: duration.max(0.0),
            midi,
            velocity: 1.0,
            file_id: file_id.into(),
            source_index: None,
        }
    }

    /// Builder: tag the note with its index in the source file
    pub fn with_source_index(mut self, index: u32) -> Self {
        self.source_index = Some(index);
        self
    }

    /// Time at which the note stops sounding
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }
}

/// A MIDI control change, value normalized to 0.0..=1.0
#[derive(Debug, Clone, PartialEq)]
pub struct ControlChangeEvent {
    pub time: f64,
    pub controller: u8,
    pub value: f32,
    pub file_id: String,
}

impl ControlChangeEvent {
    pub fn new(time: f64, controller: u8, value: f32, file_id: impl Into<String>) -> Self {
        Self {
            time,
            controller,
            value,
            file_id: file_id.into(),
        }
    }

    /// Sustain pedal event helper
    pub fn sustain(time: f64, value: f32, file_id: impl Into<String>) -> Self {
        Self::new(time, SUSTAIN_CONTROLLER, value, file_id)
    }
}

/// Time interval where notes of several tracks overlap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteInterval {
    pub start: f64,
    pub end: f64,
}

// =============================================================================
// Derived / engine-owned entities
// =============================================================================

/// Interval during which a file's sustain pedal is held down
#[derive(Debug, Clone, PartialEq)]
pub struct SustainSegment {
    pub start: f64,
    pub end: f64,
    pub file_id: String,
}

/// A/B loop markers
///
/// Both `None` means no loop. Only `start` set draws an open-ended marker
/// without a shaded region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl LoopWindow {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// Whether both bounds are set (a shaded region is drawn)
    pub fn is_closed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Pan/zoom/time snapshot of the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Horizontal multiplicative zoom on top of the base time scale
    pub zoom_x: f64,
    /// Vertical multiplicative zoom, anchored at the canvas midline
    pub zoom_y: f64,
    /// Horizontal pixel offset applied after scaling
    pub pan_x: f64,
    /// Vertical pixel offset applied after scaling
    pub pan_y: f64,
    /// Time under the fixed playhead
    pub current_time: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom_x: 1.0,
            zoom_y: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            current_time: 0.0,
        }
    }
}

/// Inclusive MIDI pitch range mapped onto the usable canvas height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRange {
    pub min: u8,
    pub max: u8,
}

impl NoteRange {
    /// Number of semitone steps between the bounds (at least 1)
    pub fn span(&self) -> u8 {
        self.max.saturating_sub(self.min).max(1)
    }
}

impl Default for NoteRange {
    /// Full 88-key piano (A0 to C8)
    fn default() -> Self {
        Self { min: 21, max: 108 }
    }
}

// =============================================================================
// Styling enums (config-facing)
// =============================================================================

/// How note tints are composited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightMode {
    /// Per-file colors, normal blending
    #[default]
    File,
    /// Additive blending so overlapping notes of different files mix
    HighlightBlend,
}

/// Subtle tiled pattern used to tell files apart without relying on hue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    Up,
    Down,
    Cross,
    Dots,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Up => "up",
            PatternKind::Down => "down",
            PatternKind::Cross => "cross",
            PatternKind::Dots => "dots",
        }
    }
}

/// Onset marker glyph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnsetMarkerShape {
    #[default]
    Circle,
    Square,
    Diamond,
    TriangleUp,
    TriangleDown,
    TriangleLeft,
    TriangleRight,
    Star,
    Cross,
    Plus,
    Hexagon,
    Pentagon,
    ChevronUp,
    ChevronDown,
}

impl OnsetMarkerShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnsetMarkerShape::Circle => "circle",
            OnsetMarkerShape::Square => "square",
            OnsetMarkerShape::Diamond => "diamond",
            OnsetMarkerShape::TriangleUp => "triangle-up",
            OnsetMarkerShape::TriangleDown => "triangle-down",
            OnsetMarkerShape::TriangleLeft => "triangle-left",
            OnsetMarkerShape::TriangleRight => "triangle-right",
            OnsetMarkerShape::Star => "star",
            OnsetMarkerShape::Cross => "cross",
            OnsetMarkerShape::Plus => "plus",
            OnsetMarkerShape::Hexagon => "hexagon",
            OnsetMarkerShape::Pentagon => "pentagon",
            OnsetMarkerShape::ChevronUp => "chevron-up",
            OnsetMarkerShape::ChevronDown => "chevron-down",
        }
    }
}

/// Filled glyphs get a white interior, outlined glyphs are stroke-only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnsetMarkerVariant {
    #[default]
    Filled,
    Outlined,
}

impl OnsetMarkerVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnsetMarkerVariant::Filled => "filled",
            OnsetMarkerVariant::Outlined => "outlined",
        }
    }
}

/// Per-file onset marker style
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetMarkerStyle {
    pub shape: OnsetMarkerShape,
    pub variant: OnsetMarkerVariant,
    /// Preferred marker size in pixels at zoom 1
    pub size: f32,
    pub stroke_width: f32,
}

impl Default for OnsetMarkerStyle {
    fn default() -> Self {
        Self {
            shape: OnsetMarkerShape::Circle,
            variant: OnsetMarkerVariant::Filled,
            size: 12.0,
            stroke_width: 2.0,
        }
    }
}
