//! Viewport and coordinate transforms
//!
//! Single source of truth for time <-> pixel and pitch <-> pixel conversion.
//!
//! Two coordinate spaces are used throughout the renderer:
//!
//! ```text
//! content space:  x = base_time(t) * zoom_x + gutter      (pan-free)
//!                 y = (base_pitch(p) - center_y) * zoom_y + center_y
//! screen space:   content + (pan_x, pan_y)
//! ```
//!
//! The playhead is fixed at the gutter edge in screen space, so the time under
//! the playhead is `pixel_to_time(gutter - pan_x)`. Panning moves content under
//! a stationary playhead.

use crate::config::ZoomLimits;
use crate::types::{NoteRange, ViewportState};

/// Width of the piano-key column at the left edge when enabled
pub const PIANO_KEYS_WIDTH: f64 = 60.0;

/// Zoom factor applied per wheel notch (reciprocal when zooming out)
pub const ZOOM_STEP_FACTOR: f64 = 1.1;

/// Waveform band sizing, relative to canvas height
const BAND_HEIGHT_RATIO: f64 = 0.22;
const BAND_MIN_HEIGHT: f64 = 24.0;
const BAND_MAX_HEIGHT: f64 = 96.0;
/// Gap kept between the note area and the waveform band
const BAND_PADDING: f64 = 6.0;

// =============================================================================
// Linear Scale
// =============================================================================

/// Continuous linear mapping from a domain interval onto a range interval
///
/// Degenerate intervals are widened to one unit so `apply`/`invert` never
/// divide by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    #[inline]
    fn domain_span(&self) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span.abs() < f64::EPSILON {
            1.0
        } else {
            span
        }
    }

    #[inline]
    fn range_span(&self) -> f64 {
        let span = self.range.1 - self.range.0;
        if span.abs() < f64::EPSILON {
            1.0
        } else {
            span
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.range.0 + (value - self.domain.0) / self.domain_span() * self.range_span()
    }

    #[inline]
    pub fn invert(&self, pixel: f64) -> f64 {
        self.domain.0 + (pixel - self.range.0) / self.range_span() * self.domain_span()
    }
}

// =============================================================================
// Waveform band layout
// =============================================================================

/// Vertical layout of the waveform band at the bottom of the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLayout {
    /// Y of the band's top edge
    pub top: f64,
    /// Band height in pixels
    pub height: f64,
    /// Height available to notes/sustains above the band (and its padding)
    pub usable_height: f64,
}

impl BandLayout {
    pub fn for_height(canvas_height: f64) -> Self {
        let height = (canvas_height * BAND_HEIGHT_RATIO)
            .floor()
            .clamp(BAND_MIN_HEIGHT, BAND_MAX_HEIGHT);
        Self {
            top: canvas_height - height,
            height,
            usable_height: (canvas_height - (BAND_PADDING + height)).max(0.0),
        }
    }

    pub fn mid_y(&self) -> f64 {
        self.top + self.height * 0.5
    }
}

// =============================================================================
// Viewport
// =============================================================================

/// Pan/zoom state plus the scales needed to convert between time, pitch and pixels
#[derive(Debug, Clone)]
pub struct Viewport {
    width: f64,
    height: f64,
    gutter: f64,
    max_time: f64,
    note_range: NoteRange,
    limits: ZoomLimits,
    state: ViewportState,
    time_scale: LinearScale,
    pitch_scale: LinearScale,
}

impl Viewport {
    pub fn new(
        width: f64,
        height: f64,
        show_piano_keys: bool,
        note_range: NoteRange,
        limits: ZoomLimits,
    ) -> Self {
        let mut viewport = Self {
            width: width.max(1.0),
            height: height.max(1.0),
            gutter: if show_piano_keys { PIANO_KEYS_WIDTH } else { 0.0 },
            max_time: 1.0,
            note_range,
            limits,
            state: ViewportState::default(),
            time_scale: LinearScale::new((0.0, 1.0), (0.0, 1.0)),
            pitch_scale: LinearScale::new((0.0, 1.0), (0.0, 1.0)),
        };
        viewport.rebuild_scales();
        viewport
    }

    fn rebuild_scales(&mut self) {
        let time_range = (self.width - self.gutter).max(1.0);
        self.time_scale = LinearScale::new((0.0, self.max_time), (0.0, time_range));

        // Rows are centred on their pitch, so inset the extreme rows by half a row
        let usable = self.usable_height().max(1.0);
        let row = usable / (self.note_range.span() as f64 + 1.0);
        self.pitch_scale = LinearScale::new(
            (self.note_range.min as f64, self.note_range.min as f64 + self.note_range.span() as f64),
            (usable - row / 2.0, row / 2.0),
        );
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Gutter width (piano-key column), 0 when disabled
    pub fn gutter(&self) -> f64 {
        self.gutter
    }

    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    pub fn note_range(&self) -> NoteRange {
        self.note_range
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn band(&self) -> BandLayout {
        BandLayout::for_height(self.height)
    }

    pub fn usable_height(&self) -> f64 {
        self.band().usable_height
    }

    /// Vertical zoom anchor
    pub fn center_y(&self) -> f64 {
        self.height / 2.0
    }

    /// Screen x of the stationary playhead
    pub fn playhead_x(&self) -> f64 {
        self.gutter
    }

    // -------------------------------------------------------------------------
    // Layout mutation
    // -------------------------------------------------------------------------

    /// Resize the viewport, keeping the current time under the playhead
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        self.rebuild_scales();
        self.set_time(self.state.current_time);
        self.clamp_pan();
    }

    /// Set content duration; the base time scale maps `[0, max_time]` onto the timeline width
    pub fn set_max_time(&mut self, max_time: f64) {
        self.max_time = if max_time.is_finite() { max_time.max(1.0) } else { 1.0 };
        self.rebuild_scales();
        self.set_time(self.state.current_time);
    }

    pub fn set_show_piano_keys(&mut self, show: bool) {
        self.gutter = if show { PIANO_KEYS_WIDTH } else { 0.0 };
        self.rebuild_scales();
        self.set_time(self.state.current_time);
    }

    pub fn set_note_range(&mut self, note_range: NoteRange) {
        self.note_range = note_range;
        self.rebuild_scales();
        self.clamp_pan();
    }

    pub fn set_limits(&mut self, limits: ZoomLimits) {
        self.limits = limits;
        self.state.zoom_x = self.limits.clamp_x(self.state.zoom_x);
        self.state.zoom_y = self.limits.clamp_y(self.state.zoom_y);
        self.set_time(self.state.current_time);
        self.clamp_pan();
    }

    // -------------------------------------------------------------------------
    // Time axis
    // -------------------------------------------------------------------------

    /// Content-space x of a time (gutter included, pan excluded)
    #[inline]
    pub fn time_to_pixel(&self, time: f64) -> f64 {
        self.time_scale.apply(time) * self.state.zoom_x + self.gutter
    }

    /// Exact inverse of [`time_to_pixel`](Self::time_to_pixel)
    #[inline]
    pub fn pixel_to_time(&self, pixel: f64) -> f64 {
        self.time_scale.invert((pixel - self.gutter) / self.state.zoom_x)
    }

    /// Length in pixels of a duration (no gutter offset)
    #[inline]
    pub fn duration_to_pixels(&self, duration: f64) -> f64 {
        (self.time_scale.apply(duration) - self.time_scale.apply(0.0)) * self.state.zoom_x
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.duration_to_pixels(1.0)
    }

    /// Time under a screen-space x
    #[inline]
    pub fn screen_to_time(&self, screen_x: f64) -> f64 {
        self.pixel_to_time(screen_x - self.state.pan_x)
    }

    /// Visible `(start, end)` time interval, clipped to `[0, max_time]`
    pub fn visible_time_range(&self) -> (f64, f64) {
        let start = self.screen_to_time(0.0).clamp(0.0, self.max_time);
        let end = self.screen_to_time(self.width).clamp(0.0, self.max_time);
        (start, end.max(start))
    }

    pub fn time_at_playhead(&self) -> f64 {
        self.screen_to_time(self.playhead_x())
            .clamp(0.0, self.max_time)
    }

    // -------------------------------------------------------------------------
    // Pitch axis
    // -------------------------------------------------------------------------

    /// Content-space y of a pitch centre, vertical zoom anchored at the canvas midline
    #[inline]
    pub fn pitch_to_pixel(&self, pitch: f64) -> f64 {
        let center = self.center_y();
        (self.pitch_scale.apply(pitch) - center) * self.state.zoom_y + center
    }

    #[inline]
    pub fn pixel_to_pitch(&self, pixel: f64) -> f64 {
        let center = self.center_y();
        self.pitch_scale
            .invert((pixel - center) / self.state.zoom_y + center)
    }

    /// Height of one semitone row at zoom 1
    pub fn base_row_height(&self) -> f64 {
        let min_y = self.pitch_scale.apply(self.note_range.min as f64);
        let max_y = self
            .pitch_scale
            .apply(self.note_range.min as f64 + self.note_range.span() as f64);
        (min_y - max_y).abs() / self.note_range.span() as f64
    }

    /// Height of one semitone row at the current vertical zoom, at least 1px
    pub fn row_height(&self) -> f64 {
        (self.base_row_height() * self.state.zoom_y).max(1.0)
    }

    // -------------------------------------------------------------------------
    // Pan / zoom
    // -------------------------------------------------------------------------

    /// Allowed `(min, max)` for `pan_x`: the playhead may sit anywhere in `[0, max_time]`
    pub fn pan_x_bounds(&self) -> (f64, f64) {
        (-self.duration_to_pixels(self.max_time), 0.0)
    }

    /// Allowed `(min, max)` for `pan_y`: only zoomed-in content can be scrolled vertically
    pub fn pan_y_bounds(&self) -> (f64, f64) {
        let half_row = self.row_height() / 2.0;
        let top = self.pitch_to_pixel(self.note_range.min as f64 + self.note_range.span() as f64)
            - half_row;
        let bottom = self.pitch_to_pixel(self.note_range.min as f64) + half_row;
        let usable = self.usable_height();
        ((usable - bottom).min(0.0), (-top).max(0.0))
    }

    fn clamp_pan(&mut self) {
        let (min_x, max_x) = self.pan_x_bounds();
        let (min_y, max_y) = self.pan_y_bounds();
        self.state.pan_x = self.state.pan_x.clamp(min_x, max_x);
        self.state.pan_y = self.state.pan_y.clamp(min_y, max_y);
    }

    /// Move the timeline so `time` sits under the playhead
    pub fn set_time(&mut self, time: f64) {
        let time = if time.is_finite() { time.clamp(0.0, self.max_time) } else { 0.0 };
        self.state.current_time = time;
        self.state.pan_x = self.playhead_x() - self.time_to_pixel(time);
        self.clamp_pan();
    }

    /// Multiply horizontal zoom, keeping the time under `anchor_x` (screen) fixed
    ///
    /// The anchor defaults to the playhead. Returns `false` when the clamped zoom
    /// did not change or the factor is not a positive finite number.
    pub fn zoom_x(&mut self, factor: f64, anchor_x: Option<f64>) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let anchor = anchor_x.unwrap_or(self.playhead_x());
        let anchor_time = self.screen_to_time(anchor);
        let zoom = self.limits.clamp_x(self.state.zoom_x * factor);
        if (zoom - self.state.zoom_x).abs() < f64::EPSILON {
            return false;
        }
        self.state.zoom_x = zoom;
        self.state.pan_x = anchor - self.time_to_pixel(anchor_time);
        self.clamp_pan();
        self.state.current_time = self.time_at_playhead();
        true
    }

    /// Multiply vertical zoom (anchored at the canvas midline)
    pub fn zoom_y(&mut self, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let zoom = self.limits.clamp_y(self.state.zoom_y * factor);
        if (zoom - self.state.zoom_y).abs() < f64::EPSILON {
            return false;
        }
        self.state.zoom_y = zoom;
        self.clamp_pan();
        true
    }

    /// Offset the pan by a pixel delta and resync the time under the playhead
    ///
    /// Returns the new current time.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> f64 {
        if dx.is_finite() {
            self.state.pan_x += dx;
        }
        if dy.is_finite() {
            self.state.pan_y += dy;
        }
        self.clamp_pan();
        self.state.current_time = self.time_at_playhead();
        self.state.current_time
    }

    /// Back to zoom 1 with no vertical offset, current time kept under the playhead
    pub fn reset(&mut self) {
        self.state.zoom_x = self.limits.clamp_x(1.0);
        self.state.zoom_y = self.limits.clamp_y(1.0);
        self.state.pan_y = 0.0;
        self.set_time(self.state.current_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(800.0, 400.0, true, NoteRange::default(), ZoomLimits::default());
        vp.set_max_time(120.0);
        vp
    }

    #[test]
    fn test_time_round_trip_under_pan_and_zoom() {
        let mut vp = viewport();
        for &(zoom, time) in &[(1.0, 0.0), (3.7, 40.0), (0.35, 110.0), (42.0, 61.25)] {
            vp.zoom_x(zoom / vp.state().zoom_x, None);
            vp.set_time(time);
            let mut t = 0.0;
            while t <= vp.max_time() {
                let back = vp.pixel_to_time(vp.time_to_pixel(t));
                assert!((back - t).abs() < 1e-6, "round trip failed at t={} zoom={}", t, zoom);
                t += 0.37;
            }
        }
    }

    #[test]
    fn test_time_zero_maps_to_gutter() {
        let vp = viewport();
        assert_eq!(vp.time_to_pixel(0.0), PIANO_KEYS_WIDTH);
        assert!((vp.time_to_pixel(vp.max_time()) - vp.width()).abs() < 1e-9);
        assert!((vp.duration_to_pixels(vp.max_time()) - (800.0 - PIANO_KEYS_WIDTH)).abs() < 1e-9);
    }

    #[test]
    fn test_pitch_round_trip_and_center_anchor() {
        let mut vp = viewport();
        vp.zoom_y(2.5);
        for midi in 21..=108u8 {
            let y = vp.pitch_to_pixel(midi as f64);
            assert!((vp.pixel_to_pitch(y) - midi as f64).abs() < 1e-9);
        }
        // A pitch whose base position is the midline doesn't move under zoom
        let center_pitch = vp.pixel_to_pitch(vp.center_y());
        assert!((vp.pitch_to_pixel(center_pitch) - vp.center_y()).abs() < 1e-9);
    }

    #[test]
    fn test_row_height_matches_pitch_span() {
        let vp = viewport();
        let span = vp.note_range().span() as f64;
        let top = vp.pitch_to_pixel(108.0);
        let bottom = vp.pitch_to_pixel(21.0);
        assert!(((bottom - top) / span - vp.row_height()).abs() < 1e-9);
        assert!(bottom < vp.usable_height(), "Lowest row must stay above the band");
    }

    #[test]
    fn test_zoom_never_reaches_zero() {
        let mut vp = viewport();
        for _ in 0..500 {
            vp.zoom_x(0.5, None);
            vp.zoom_y(0.5);
        }
        assert!(vp.state().zoom_x > 0.0);
        assert!(vp.state().zoom_y > 0.0);
        assert_eq!(vp.state().zoom_x, ZoomLimits::default().min_x);
        assert_eq!(vp.state().zoom_y, ZoomLimits::default().min_y);
    }

    #[test]
    fn test_invalid_zoom_factors_are_ignored() {
        let mut vp = viewport();
        assert!(!vp.zoom_x(0.0, None));
        assert!(!vp.zoom_x(-2.0, None));
        assert!(!vp.zoom_y(f64::NAN));
        assert_eq!(vp.state().zoom_x, 1.0);
        assert_eq!(vp.state().zoom_y, 1.0);
    }

    #[test]
    fn test_zoom_keeps_anchor_time_fixed() {
        let mut vp = viewport();
        vp.set_time(30.0);
        let anchor = 500.0;
        let before = vp.screen_to_time(anchor);
        assert!(vp.zoom_x(ZOOM_STEP_FACTOR, Some(anchor)));
        let after = vp.screen_to_time(anchor);
        assert!((before - after).abs() < 1e-6, "time under cursor moved: {} -> {}", before, after);
    }

    #[test]
    fn test_set_time_places_time_under_playhead() {
        let mut vp = viewport();
        vp.zoom_x(4.0, None);
        vp.set_time(75.5);
        assert!((vp.time_at_playhead() - 75.5).abs() < 1e-9);
        assert!((vp.state().current_time - 75.5).abs() < 1e-9);
    }

    #[test]
    fn test_visible_range_is_clipped() {
        let mut vp = viewport();
        let (start, end) = vp.visible_time_range();
        assert_eq!(start, 0.0);
        assert!((end - vp.max_time()).abs() < 1e-9);

        vp.zoom_x(8.0, None);
        vp.set_time(119.0);
        let (start, end) = vp.visible_time_range();
        assert!(start > 100.0);
        assert_eq!(end, vp.max_time());
    }

    #[test]
    fn test_pan_is_clamped_and_syncs_time() {
        let mut vp = viewport();
        let time = vp.pan_by(10_000.0, 0.0);
        assert_eq!(vp.state().pan_x, 0.0);
        assert_eq!(time, 0.0);

        let time = vp.pan_by(-1e9, 0.0);
        assert!((time - vp.max_time()).abs() < 1e-9);

        // Content fits vertically at zoom 1: no vertical pan
        vp.pan_by(0.0, 50.0);
        assert!(vp.state().pan_y.abs() < 1e-9);
        vp.zoom_y(4.0);
        vp.pan_by(0.0, 50.0);
        assert!((vp.state().pan_y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_sizes_stay_finite() {
        let mut vp = Viewport::new(0.0, 0.0, true, NoteRange { min: 60, max: 60 }, ZoomLimits::default());
        vp.set_max_time(0.0);
        for value in [
            vp.time_to_pixel(0.5),
            vp.pixel_to_time(10.0),
            vp.pitch_to_pixel(60.0),
            vp.row_height(),
            vp.pixels_per_second(),
        ] {
            assert!(value.is_finite());
        }
        assert_eq!(vp.max_time(), 1.0);
    }

    #[test]
    fn test_resize_keeps_current_time() {
        let mut vp = viewport();
        vp.set_time(42.0);
        vp.set_size(1280.0, 720.0);
        assert!((vp.time_at_playhead() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_band_layout_clamps_height() {
        assert_eq!(BandLayout::for_height(50.0).height, 24.0);
        assert_eq!(BandLayout::for_height(1000.0).height, 96.0);
        let band = BandLayout::for_height(400.0);
        assert_eq!(band.height, 88.0);
        assert_eq!(band.usable_height, 400.0 - 94.0);
    }
}
