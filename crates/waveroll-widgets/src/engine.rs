//! Piano roll engine
//!
//! `PianoRoll` owns the viewport, the content (notes, control changes,
//! overlap regions, loop window) and every layer. Mutators only record what
//! changed; `render()` brings the stale layers up to date. Following iced 0.14
//! patterns the engine lives in application state, is mutated from `update`,
//! and the canvas program reads the prepared layers when it draws.
//!
//! What each kind of change invalidates:
//!
//! ```text
//! change               background  sprites  sustain  composite        loop  playhead
//! notes / styles           -          x        -      re-render         -      -
//! control changes          -          -        x      re-render         -      -
//! pan / set_time           x          -        -      blit only         x      -
//! zoom                     x          x        -      re-render (zoom)  x      -
//! resize                   x          x        -      re-render (size)  x      x
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use waveroll_core::{
    ControlChangeEvent, HighlightMode, LoopWindow, Note, NoteInterval, OnsetMarkerStyle,
    OriginalOnsets, PatternKind, PeakSource, PianoRollConfig, Viewport, ViewportState,
};

use crate::composite::{Composite, CompositeSources};
use crate::interaction::{classify_wheel, WheelGesture, WheelInput};
use crate::layers::{
    BackgroundLayer, GridSteps, LoopOverlayLayer, OverlapLayer, PlayheadLayer, SustainLayer,
};
use crate::scene::DisplayList;
use crate::sprites::{HatchFn, NoteColorFn, NotePaint, NoteSpritePool};
use crate::texture_cache::TextureCache;

/// Shared, read-only peak data (the audio peak registry or any other source)
pub type SharedPeakSource = Arc<dyn PeakSource + Send + Sync>;

/// Called with the time under the playhead after a pan gesture
pub type TimeChangeListener = Box<dyn FnMut(f64)>;

#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    background: bool,
    /// Note content or paint changed
    notes: bool,
    /// Sprite geometry must follow a zoom or resize
    geometry: bool,
    sustain: bool,
    loop_overlay: bool,
    playhead: bool,
}

impl Dirty {
    fn all() -> Self {
        Self {
            background: true,
            notes: true,
            geometry: true,
            sustain: true,
            loop_overlay: true,
            playhead: true,
        }
    }

    fn any(&self) -> bool {
        self.background
            || self.notes
            || self.geometry
            || self.sustain
            || self.loop_overlay
            || self.playhead
    }

    fn panned(&mut self) {
        self.background = true;
        self.loop_overlay = true;
    }

    fn zoomed(&mut self) {
        self.panned();
        self.geometry = true;
    }
}

/// Note paint configuration, copied out of `PianoRollConfig`
struct NoteStyle {
    default_color: u32,
    highlight_mode: HighlightMode,
    show_onsets: bool,
    only_original_onsets: bool,
    original_onsets: Option<OriginalOnsets>,
    file_colors: HashMap<String, u32>,
    file_patterns: HashMap<String, PatternKind>,
    onset_styles: HashMap<String, OnsetMarkerStyle>,
    color_fn: Option<Box<NoteColorFn>>,
    hatch_fn: Option<Box<HatchFn>>,
}

pub struct PianoRoll {
    viewport: Viewport,
    steps: GridSteps,
    background_color: u32,

    notes: Vec<Note>,
    control_changes: Vec<ControlChangeEvent>,
    loop_window: LoopWindow,
    style: NoteStyle,

    peaks: Option<SharedPeakSource>,
    textures: Arc<TextureCache>,

    background: BackgroundLayer,
    sprites: NoteSpritePool,
    sustain: SustainLayer,
    overlap: OverlapLayer,
    loop_overlay: LoopOverlayLayer,
    playhead: PlayheadLayer,
    composite: Composite,

    dirty: Dirty,
    time_listeners: Vec<TimeChangeListener>,
    destroyed: bool,
}

impl std::fmt::Debug for PianoRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PianoRoll")
            .field("viewport", &self.viewport)
            .field("steps", &self.steps)
            .field("notes", &self.notes.len())
            .field("control_changes", &self.control_changes.len())
            .field("loop_window", &self.loop_window)
            .field("redraw_count", &self.composite.redraw_count())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl PianoRoll {
    /// Build an engine from configuration, using the process-wide texture cache
    ///
    /// An invalid configuration is logged and replaced by the defaults.
    pub fn new(config: &PianoRollConfig) -> Self {
        let fallback;
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("PianoRoll::new: {}, using defaults", e);
                fallback = PianoRollConfig::default();
                &fallback
            }
        };

        let viewport = Viewport::new(
            config.width,
            config.height,
            config.show_piano_keys,
            config.note_range,
            config.zoom,
        );
        let playhead_color = config.playhead_color_rgb();

        log::info!(
            "[PIANO_ROLL] Created {}x{} (piano keys: {}, notes {}..={})",
            config.width,
            config.height,
            config.show_piano_keys,
            config.note_range.min,
            config.note_range.max
        );

        Self {
            viewport,
            steps: GridSteps {
                major: config.time_step,
                minor: config.minor_time_step,
            },
            background_color: config.background_color_rgb(),
            notes: Vec::new(),
            control_changes: Vec::new(),
            loop_window: LoopWindow::default(),
            style: NoteStyle {
                default_color: config.note_color_rgb(),
                highlight_mode: config.highlight_mode,
                show_onsets: config.show_onset_markers,
                only_original_onsets: config.only_original_onsets,
                original_onsets: None,
                file_colors: config.file_colors_rgb(),
                file_patterns: config.file_patterns.clone(),
                onset_styles: config.onset_styles.clone(),
                color_fn: None,
                hatch_fn: None,
            },
            peaks: None,
            textures: TextureCache::shared(),
            background: BackgroundLayer::new(),
            sprites: NoteSpritePool::new(),
            sustain: SustainLayer::new(),
            overlap: OverlapLayer::new(),
            loop_overlay: LoopOverlayLayer::new(),
            playhead: PlayheadLayer::new(playhead_color),
            composite: Composite::new(),
            dirty: Dirty::all(),
            time_listeners: Vec::new(),
            destroyed: false,
        }
    }

    /// Read waveform peaks from `source` for the bottom band
    pub fn with_peak_source(mut self, source: SharedPeakSource) -> Self {
        self.peaks = Some(source);
        self.dirty.background = true;
        self
    }

    /// Use a dedicated texture cache instead of the process-wide one
    pub fn with_texture_cache(mut self, textures: Arc<TextureCache>) -> Self {
        self.textures = textures;
        self.dirty.notes = true;
        self
    }

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    /// Replace the notes; content duration follows the latest note end or control change
    pub fn set_notes(&mut self, notes: Vec<Note>) {
        if self.destroyed {
            return;
        }
        self.notes = notes;
        self.update_max_time();
        self.dirty.notes = true;
        // Unterminated pedals close at the last note end
        self.dirty.sustain = true;
    }

    pub fn set_control_changes(&mut self, events: Vec<ControlChangeEvent>) {
        if self.destroyed {
            return;
        }
        self.control_changes = events;
        self.update_max_time();
        self.dirty.sustain = true;
    }

    pub fn set_overlap_regions(&mut self, regions: Vec<NoteInterval>) {
        if self.destroyed {
            return;
        }
        self.overlap.set_regions(regions);
        self.composite.mark_content_dirty();
    }

    pub fn set_loop_window(&mut self, start: Option<f64>, end: Option<f64>) {
        if self.destroyed {
            return;
        }
        self.loop_window = LoopWindow::new(start, end);
        self.dirty.loop_overlay = true;
    }

    fn update_max_time(&mut self) {
        let note_end = self.notes.iter().map(Note::end).fold(0.0, f64::max);
        let cc_end = self.control_changes.iter().map(|e| e.time).fold(0.0, f64::max);
        let before = self.viewport.max_time();
        self.viewport.set_max_time(note_end.max(cc_end));
        if self.viewport.max_time() != before {
            self.dirty.zoomed();
        }
    }

    // -------------------------------------------------------------------------
    // View
    // -------------------------------------------------------------------------

    /// Move the timeline so `time` sits under the playhead
    pub fn set_time(&mut self, time: f64) {
        if self.destroyed {
            return;
        }
        self.viewport.set_time(time);
        self.dirty.panned();
    }

    /// Horizontal zoom anchored at the playhead
    pub fn zoom_x(&mut self, factor: f64) {
        self.zoom_x_at(factor, None);
    }

    /// Horizontal zoom keeping the time under the screen x `anchor_x` fixed
    pub fn zoom_x_at(&mut self, factor: f64, anchor_x: Option<f64>) {
        if self.destroyed {
            return;
        }
        if self.viewport.zoom_x(factor, anchor_x) {
            self.dirty.zoomed();
        }
    }

    pub fn zoom_y(&mut self, factor: f64) {
        if self.destroyed {
            return;
        }
        if self.viewport.zoom_y(factor) {
            self.dirty.zoomed();
        }
    }

    /// Offset the view by a pixel delta
    ///
    /// Listeners receive the new time under the playhead, only when it moved.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if self.destroyed {
            return;
        }
        let before = self.viewport.state();
        let time = self.viewport.pan_by(dx, dy);
        let after = self.viewport.state();
        if after.pan_x == before.pan_x && after.pan_y == before.pan_y {
            return;
        }
        self.dirty.panned();
        if time != before.current_time {
            self.notify_time_change(time);
        }
    }

    /// Zoom back to 1x, keeping the current time under the playhead
    pub fn reset_view(&mut self) {
        if self.destroyed {
            return;
        }
        self.viewport.reset();
        self.dirty.zoomed();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if self.destroyed {
            return;
        }
        if !(width > 0.0 && height > 0.0) {
            log::debug!("[PIANO_ROLL] Ignoring resize to {}x{}", width, height);
            return;
        }
        if width == self.viewport.width() && height == self.viewport.height() {
            return;
        }
        self.viewport.set_size(width, height);
        self.dirty = Dirty {
            sustain: self.dirty.sustain,
            notes: self.dirty.notes,
            ..Dirty::all()
        };
    }

    pub fn set_time_step(&mut self, step: f64) {
        if !(step > 0.0 && step.is_finite()) {
            log::warn!("set_time_step: ignoring invalid step {}", step);
            return;
        }
        self.steps.major = step;
        self.dirty.background = true;
    }

    pub fn set_minor_time_step(&mut self, step: f64) {
        if !(step > 0.0 && step.is_finite()) {
            log::warn!("set_minor_time_step: ignoring invalid step {}", step);
            return;
        }
        self.steps.minor = step;
        self.dirty.background = true;
    }

    // -------------------------------------------------------------------------
    // Note styling
    // -------------------------------------------------------------------------

    pub fn set_note_color(&mut self, color: u32) {
        self.style.default_color = color;
        self.dirty.notes = true;
    }

    /// Per-note colour override; `None` returns to the default note colour
    pub fn set_note_color_fn(&mut self, color_fn: Option<Box<NoteColorFn>>) {
        self.style.color_fn = color_fn;
        self.dirty.notes = true;
    }

    /// Per-note evaluation hatch request
    pub fn set_hatch_fn(&mut self, hatch_fn: Option<Box<HatchFn>>) {
        self.style.hatch_fn = hatch_fn;
        self.dirty.notes = true;
    }

    pub fn set_highlight_mode(&mut self, mode: HighlightMode) {
        self.style.highlight_mode = mode;
        self.dirty.notes = true;
    }

    pub fn set_show_onset_markers(&mut self, show: bool) {
        self.style.show_onsets = show;
        self.dirty.notes = true;
    }

    pub fn set_only_original_onsets(&mut self, only: bool) {
        self.style.only_original_onsets = only;
        self.dirty.notes = true;
    }

    /// Install the original-onset index used to hide markers on split fragments
    pub fn set_original_onsets(&mut self, onsets: Option<OriginalOnsets>) {
        self.style.original_onsets = onsets;
        self.dirty.notes = true;
    }

    pub fn set_onset_style(&mut self, file_id: impl Into<String>, style: OnsetMarkerStyle) {
        self.style.onset_styles.insert(file_id.into(), style);
        self.dirty.notes = true;
    }

    pub fn set_onset_styles(&mut self, styles: HashMap<String, OnsetMarkerStyle>) {
        self.style.onset_styles = styles;
        self.dirty.notes = true;
    }

    /// Per-file colours used by sustain regions and onset markers
    pub fn set_file_colors(&mut self, colors: HashMap<String, u32>) {
        self.style.file_colors = colors;
        self.dirty.notes = true;
        self.composite.mark_content_dirty();
    }

    pub fn set_file_patterns(&mut self, patterns: HashMap<String, PatternKind>) {
        self.style.file_patterns = patterns;
        self.dirty.notes = true;
    }

    pub fn set_playhead_color(&mut self, color: Option<u32>) {
        self.playhead.set_color(color);
        self.dirty.playhead = true;
    }

    /// Peak data changed outside the engine (e.g. a track finished decoding)
    pub fn invalidate_peaks(&mut self) {
        self.dirty.background = true;
    }

    /// Re-record every layer and re-render the composite on the next `render()`
    pub fn force_redraw(&mut self) {
        self.dirty = Dirty::all();
        self.composite.force_redraw();
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Register a listener for the time under the playhead after pan gestures
    pub fn on_time_change(&mut self, listener: impl FnMut(f64) + 'static) {
        if self.destroyed {
            return;
        }
        self.time_listeners.push(Box::new(listener));
    }

    fn notify_time_change(&mut self, time: f64) {
        for listener in &mut self.time_listeners {
            listener(time);
        }
    }

    /// Apply one wheel event: vertical zoom, horizontal pan or cursor-anchored time zoom
    pub fn handle_wheel(&mut self, input: WheelInput) -> Option<WheelGesture> {
        if self.destroyed {
            return None;
        }
        let gesture = classify_wheel(&input, self.viewport.width());
        match gesture {
            WheelGesture::ZoomY { factor } => self.zoom_y(factor),
            WheelGesture::Pan { dx } => self.pan(-dx, 0.0),
            WheelGesture::ZoomX { factor, anchor_x } => self.zoom_x_at(factor, Some(anchor_x)),
        }
        Some(gesture)
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Whether `render()` has work to do
    pub fn needs_render(&self) -> bool {
        !self.destroyed && (self.dirty.any() || self.composite.redraw_reason(&self.viewport).is_some())
    }

    /// Bring every stale layer up to date
    pub fn render(&mut self) {
        if self.destroyed {
            return;
        }
        let dirty = std::mem::take(&mut self.dirty);

        if dirty.sustain {
            self.sustain.rebuild(&self.control_changes, &self.notes);
            self.composite.mark_content_dirty();
        }

        if dirty.notes || dirty.geometry {
            let style = &self.style;
            let paint = NotePaint {
                default_color: style.default_color,
                color_fn: style.color_fn.as_deref(),
                hatch_fn: style.hatch_fn.as_deref(),
                highlight_mode: style.highlight_mode,
                show_onsets: style.show_onsets,
                only_original_onsets: style.only_original_onsets,
                original_onsets: style.original_onsets.as_ref(),
                file_colors: &style.file_colors,
                file_patterns: &style.file_patterns,
                onset_styles: &style.onset_styles,
                textures: &self.textures,
            };
            self.sprites.update(&self.notes, &self.viewport, &paint);
            if dirty.notes {
                self.composite.mark_content_dirty();
            }
        }

        self.composite.prepare(
            &self.viewport,
            &CompositeSources {
                sprites: &self.sprites,
                sustain: &self.sustain,
                overlap: &self.overlap,
                file_colors: &self.style.file_colors,
            },
        );

        if dirty.background {
            let peaks = self.peaks.as_deref().map(|p| p as &dyn PeakSource);
            self.background.render(&self.viewport, self.steps, peaks);
        }
        if dirty.loop_overlay {
            self.loop_overlay.render(&self.viewport, self.loop_window);
        }
        if dirty.playhead {
            self.playhead.render(&self.viewport);
        }
    }

    /// Release the offscreen tiles and drop listeners; later calls are no-ops
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.composite.release();
        self.sprites.reconcile(0);
        self.time_listeners.clear();
        log::info!("[PIANO_ROLL] Destroyed");
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Zoom/pan/time snapshot
    pub fn state(&self) -> ViewportState {
        self.viewport.state()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn time_step(&self) -> f64 {
        self.steps.major
    }

    pub fn minor_time_step(&self) -> f64 {
        self.steps.minor
    }

    pub fn visible_time_range(&self) -> (f64, f64) {
        self.viewport.visible_time_range()
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.viewport.pixels_per_second()
    }

    /// Full composite re-renders so far
    pub fn redraw_count(&self) -> u64 {
        self.composite.redraw_count()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn loop_window(&self) -> LoopWindow {
        self.loop_window
    }

    pub fn background_color(&self) -> u32 {
        self.background_color
    }

    pub fn sprites(&self) -> &NoteSpritePool {
        &self.sprites
    }

    pub fn sustain(&self) -> &SustainLayer {
        &self.sustain
    }

    pub fn composite(&self) -> &Composite {
        &self.composite
    }

    pub fn background_list(&self) -> &DisplayList {
        self.background.display_list()
    }

    pub fn loop_list(&self) -> &DisplayList {
        self.loop_overlay.display_list()
    }

    pub fn playhead_list(&self) -> &DisplayList {
        self.playhead.display_list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use waveroll_core::{AudioPeakRegistry, PeakBuffers, RegisteredAudio, ZOOM_STEP_FACTOR};

    fn engine() -> PianoRoll {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut roll = PianoRoll::new(&PianoRollConfig::default())
            .with_texture_cache(Arc::new(TextureCache::new()));
        roll.set_notes(notes(40));
        roll.render();
        roll
    }

    fn notes(count: usize) -> Vec<Note> {
        (0..count)
            .map(|i| Note::new(i as f64 * 0.5, 0.4, 48 + (i % 24) as u8, "a").with_source_index(i as u32))
            .collect()
    }

    #[test]
    fn test_pool_matches_note_count_across_updates() {
        let mut roll = engine();
        for count in [0, 50, 3, 200, 0] {
            roll.set_notes(notes(count));
            roll.render();
            assert_eq!(roll.sprites().pool_lengths(), (count, count, count, count));
        }
    }

    #[test]
    fn test_max_time_follows_content() {
        let mut roll = engine();
        // Last note: 19.5 + 0.4
        assert!((roll.viewport().max_time() - 19.9).abs() < 1e-9);
        roll.set_control_changes(vec![ControlChangeEvent::sustain(30.0, 1.0, "a")]);
        assert_eq!(roll.viewport().max_time(), 30.0);
        roll.set_notes(Vec::new());
        roll.set_control_changes(Vec::new());
        assert_eq!(roll.viewport().max_time(), 1.0);
    }

    #[test]
    fn test_panning_wide_content_never_rerenders_composite() {
        let mut roll = engine();
        let notes: Vec<Note> = (0..2000)
            .map(|i| Note::new(i as f64 * 0.3, 0.25, 36 + (i % 48) as u8, "a"))
            .collect();
        roll.set_notes(notes);
        roll.zoom_x(10.0);
        roll.render();
        assert!(roll.composite().tiles().len() > 1);

        let count = roll.redraw_count();
        for _ in 0..400 {
            roll.pan(-20.0, 0.0);
            roll.render();
        }
        assert_eq!(roll.redraw_count(), count);
        assert_eq!(roll.state().zoom_x, 10.0);
        assert!(roll.composite().visible_tiles(roll.viewport()).count() > 0);
    }

    #[test]
    fn test_panning_never_rerenders_composite() {
        let mut roll = engine();
        let count = roll.redraw_count();
        let mut last_x = roll.composite().blit_rect(roll.viewport()).unwrap().x;
        for _ in 0..10 {
            roll.pan(-20.0, 0.0);
            roll.render();
            let x = roll.composite().blit_rect(roll.viewport()).unwrap().x;
            assert!(x < last_x);
            last_x = x;
        }
        assert_eq!(roll.redraw_count(), count);

        roll.zoom_x(2.0);
        roll.render();
        assert_eq!(roll.redraw_count(), count + 1);
    }

    #[test]
    fn test_zoom_factor_never_collapses() {
        let mut roll = engine();
        for _ in 0..500 {
            roll.zoom_x(0.5);
            roll.zoom_y(0.5);
        }
        let state = roll.state();
        assert!(state.zoom_x > 0.0 && state.zoom_y > 0.0);
        assert_eq!(state.zoom_x, 0.1);
        assert_eq!(state.zoom_y, 0.25);
    }

    #[test]
    fn test_wheel_zooms_at_cursor() {
        let mut roll = engine();
        let before = roll.viewport().screen_to_time(400.0);
        let gesture = roll.handle_wheel(WheelInput {
            delta_y: -10.0,
            cursor_x: 400.0,
            ..WheelInput::default()
        });
        assert!(matches!(gesture, Some(WheelGesture::ZoomX { .. })));
        assert!((roll.state().zoom_x - ZOOM_STEP_FACTOR).abs() < 1e-12);
        assert!((roll.viewport().screen_to_time(400.0) - before).abs() < 1e-6);
    }

    #[test]
    fn test_alt_wheel_zooms_pitch_without_panning() {
        let mut roll = engine();
        roll.set_time(5.0);
        let pan_x = roll.state().pan_x;
        roll.handle_wheel(WheelInput {
            delta_y: -10.0,
            alt: true,
            cursor_x: 400.0,
            ..WheelInput::default()
        });
        assert_eq!(roll.state().pan_x, pan_x);
        assert_eq!(roll.state().zoom_x, 1.0);
        assert!((roll.state().zoom_y - ZOOM_STEP_FACTOR).abs() < 1e-12);
    }

    #[test]
    fn test_horizontal_wheel_pans_and_notifies() {
        let mut roll = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        roll.on_time_change(move |t| sink.borrow_mut().push(t));

        roll.handle_wheel(WheelInput {
            delta_x: 37.0,
            delta_y: 2.0,
            ..WheelInput::default()
        });
        assert_eq!(roll.state().pan_x, -37.0);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!((seen[0] - roll.state().current_time).abs() < 1e-12);
        assert!(seen[0] > 0.0);
    }

    #[test]
    fn test_pan_notifies_only_when_time_moves() {
        let mut roll = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        roll.on_time_change(move |t| sink.borrow_mut().push(t));

        // Already at the start: panning further back is clamped away
        roll.pan(50.0, 0.0);
        assert!(seen.borrow().is_empty());

        // Vertical only: the playhead keeps its time
        roll.zoom_y(4.0);
        roll.pan(0.0, -30.0);
        assert!(seen.borrow().is_empty());

        roll.pan(-20.0, 0.0);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_reset_view_keeps_time() {
        let mut roll = engine();
        roll.set_time(8.0);
        roll.zoom_x(3.0);
        roll.zoom_y(2.0);
        roll.reset_view();
        let state = roll.state();
        assert_eq!((state.zoom_x, state.zoom_y, state.pan_y), (1.0, 1.0, 0.0));
        assert!((roll.viewport().time_at_playhead() - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_time_steps_reject_invalid_values() {
        let mut roll = engine();
        roll.set_time_step(2.0);
        roll.set_minor_time_step(0.25);
        roll.set_time_step(0.0);
        roll.set_minor_time_step(f64::NAN);
        assert_eq!(roll.time_step(), 2.0);
        assert_eq!(roll.minor_time_step(), 0.25);
    }

    #[test]
    fn test_sustain_follows_control_changes() {
        let mut roll = engine();
        roll.set_control_changes(vec![
            ControlChangeEvent::sustain(1.0, 1.0, "a"),
            ControlChangeEvent::sustain(3.0, 0.0, "a"),
        ]);
        let before = roll.redraw_count();
        roll.render();
        assert_eq!(roll.sustain().segments().len(), 1);
        assert_eq!(roll.redraw_count(), before + 1);
    }

    #[test]
    fn test_waveform_band_reads_injected_source() {
        let registry = Arc::new(AudioPeakRegistry::new());
        registry.add_item(RegisteredAudio::new("mix", "Mix"));
        registry.set_peaks("mix", 20.0, PeakBuffers::new(vec![-0.4; 64], vec![0.6; 64]));

        let mut roll = PianoRoll::new(&PianoRollConfig::default()).with_peak_source(registry);
        roll.set_notes(notes(40));
        roll.render();
        assert!(roll.background_list().len() > 700);
    }

    #[test]
    fn test_destroy_twice_is_harmless() {
        let mut roll = engine();
        roll.destroy();
        roll.destroy();
        assert!(roll.is_destroyed());
        assert!(!roll.composite().is_rendered());
        assert!(roll.sprites().is_empty());

        // Mutators and render are inert afterwards
        roll.set_notes(notes(5));
        roll.render();
        assert!(roll.sprites().is_empty());
        assert!(!roll.needs_render());
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let config = PianoRollConfig {
            time_step: -1.0,
            ..PianoRollConfig::default()
        };
        let roll = PianoRoll::new(&config);
        assert_eq!(roll.time_step(), 1.0);
    }
}
