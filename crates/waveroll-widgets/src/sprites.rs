//! Note sprite pool
//!
//! One drawable per note, plus three auxiliary pools (file pattern, onset
//! marker, evaluation hatch) that always have the same length as the primary
//! pool. `drawables[i]` corresponds to `notes[i]` for the duration of a render
//! pass. The pool grows by appending and shrinks from the tail, so unaffected
//! drawables are never recreated.
//!
//! Geometry is kept in pan-free content space; the composite applies pan.

use std::collections::HashMap;
use std::sync::Arc;

use waveroll_core::{
    HighlightMode, Note, OnsetMarkerStyle, OriginalOnsets, PatternKind, Viewport,
};

use crate::raster::{BlendMode, PixelBuffer};
use crate::texture_cache::{HatchDirection, Texture, TextureCache, TextureKind};
use crate::theme::{EVAL_HIGHLIGHT, NEUTRAL_GRAY_ALPHA, NEUTRAL_GRAY_NOTE, PATTERN_TINT};

pub const PATTERN_ALPHA: f32 = 0.18;
pub const HATCH_ALPHA: f32 = 0.55;
pub const ONSET_ALPHA: f32 = 0.95;
/// Smallest preferred onset marker size before zoom scaling
const ONSET_MIN_PREFERRED: f32 = 8.0;
const ONSET_MIN_SIZE: f32 = 6.0;
/// Markers never exceed this fraction of the row height
const ONSET_ROW_FRACTION: f32 = 0.9;

/// Per-note colour override
pub type NoteColorFn = dyn Fn(&Note, usize) -> u32;
/// Per-note evaluation hatch request
pub type HatchFn = dyn Fn(&Note, usize) -> Option<HatchDirection>;

/// Pixel rectangle in content space
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Whether any part lies within the horizontal band `[left, right)`
    fn overlaps_x(&self, left: f32, right: f32) -> bool {
        self.x + self.width >= left && self.x < right
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDrawable {
    pub rect: Rect,
    pub tint: u32,
    pub alpha: f32,
    pub blend: BlendMode,
}

/// Tiled overlay (file pattern or evaluation hatch)
#[derive(Debug, Clone, Default)]
pub struct OverlayDrawable {
    pub visible: bool,
    pub rect: Rect,
    pub texture: Option<Arc<Texture>>,
}

#[derive(Debug, Clone, Default)]
pub struct OnsetDrawable {
    pub visible: bool,
    pub rect: Rect,
    pub texture: Option<Arc<Texture>>,
}

/// Everything the pool needs to paint notes, borrowed from the engine for one pass
pub struct NotePaint<'a> {
    pub default_color: u32,
    pub color_fn: Option<&'a NoteColorFn>,
    pub hatch_fn: Option<&'a HatchFn>,
    pub highlight_mode: HighlightMode,
    pub show_onsets: bool,
    pub only_original_onsets: bool,
    pub original_onsets: Option<&'a OriginalOnsets>,
    pub file_colors: &'a HashMap<String, u32>,
    pub file_patterns: &'a HashMap<String, PatternKind>,
    pub onset_styles: &'a HashMap<String, OnsetMarkerStyle>,
    pub textures: &'a TextureCache,
}

#[derive(Debug, Default)]
pub struct NoteSpritePool {
    notes: Vec<NoteDrawable>,
    patterns: Vec<OverlayDrawable>,
    onsets: Vec<OnsetDrawable>,
    hatches: Vec<OverlayDrawable>,
}

impl NoteSpritePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Lengths of the (notes, patterns, onsets, hatches) pools
    pub fn pool_lengths(&self) -> (usize, usize, usize, usize) {
        (self.notes.len(), self.patterns.len(), self.onsets.len(), self.hatches.len())
    }

    fn is_aligned(&self) -> bool {
        let n = self.notes.len();
        self.patterns.len() == n && self.onsets.len() == n && self.hatches.len() == n
    }

    pub fn note(&self, index: usize) -> Option<&NoteDrawable> {
        self.notes.get(index)
    }

    pub fn pattern(&self, index: usize) -> Option<&OverlayDrawable> {
        self.patterns.get(index)
    }

    pub fn onset(&self, index: usize) -> Option<&OnsetDrawable> {
        self.onsets.get(index)
    }

    pub fn hatch(&self, index: usize) -> Option<&OverlayDrawable> {
        self.hatches.get(index)
    }

    /// Grow or shrink every pool to `count`, in lock-step
    pub fn reconcile(&mut self, count: usize) {
        let before = self.notes.len();
        while self.notes.len() < count {
            self.notes.push(NoteDrawable::default());
            self.patterns.push(OverlayDrawable::default());
            self.onsets.push(OnsetDrawable::default());
            self.hatches.push(OverlayDrawable::default());
        }
        while self.notes.len() > count {
            self.notes.pop();
            let len = self.notes.len();
            self.patterns.truncate(len);
            self.onsets.truncate(len);
            self.hatches.truncate(len);
        }
        debug_assert!(self.is_aligned(), "auxiliary sprite pools out of step");
        if before != count {
            log::debug!("[SPRITES] Pool resized {} -> {}", before, count);
        }
    }

    /// Reconcile against `notes` and recompute geometry and paint for every drawable
    pub fn update(&mut self, notes: &[Note], viewport: &Viewport, paint: &NotePaint<'_>) {
        self.reconcile(notes.len());

        let row_height = viewport.row_height() as f32;
        let zoom_y = viewport.state().zoom_y as f32;
        let blend = match paint.highlight_mode {
            HighlightMode::HighlightBlend => BlendMode::Add,
            HighlightMode::File => BlendMode::Normal,
        };

        // Per-pass texture lookups, so the shared cache lock is taken once per key
        let mut onset_textures: HashMap<(&str, u32), Arc<Texture>> = HashMap::new();
        let mut overlay_textures: HashMap<String, Arc<Texture>> = HashMap::new();
        let mut overlay_texture = |kind: TextureKind| -> Arc<Texture> {
            overlay_textures
                .entry(kind.cache_key())
                .or_insert_with(|| paint.textures.get(&kind))
                .clone()
        };

        for (idx, note) in notes.iter().enumerate() {
            let rect = Rect {
                x: viewport.time_to_pixel(note.time) as f32,
                y: viewport.pitch_to_pixel(note.midi as f64) as f32 - row_height / 2.0,
                width: viewport.duration_to_pixels(note.duration) as f32,
                height: row_height,
            };

            let tint = paint
                .color_fn
                .map_or(paint.default_color, |color_fn| color_fn(note, idx));
            let alpha = if tint == NEUTRAL_GRAY_NOTE { NEUTRAL_GRAY_ALPHA } else { 1.0 };
            self.notes[idx] = NoteDrawable {
                rect,
                tint,
                alpha,
                blend,
            };

            let pattern = &mut self.patterns[idx];
            match paint.file_patterns.get(&note.file_id) {
                Some(kind) => {
                    pattern.visible = true;
                    pattern.rect = rect;
                    pattern.texture = Some(overlay_texture(TextureKind::Pattern(*kind)));
                }
                None => pattern.visible = false,
            }

            let hatch = &mut self.hatches[idx];
            match paint.hatch_fn.and_then(|hatch_fn| hatch_fn(note, idx)) {
                Some(direction) => {
                    hatch.visible = true;
                    hatch.rect = rect;
                    hatch.texture = Some(overlay_texture(TextureKind::Hatch(direction)));
                }
                None => hatch.visible = false,
            }

            let onset = &mut self.onsets[idx];
            onset.visible = false;
            if !paint.show_onsets {
                continue;
            }
            if paint.only_original_onsets {
                if let Some(index) = paint.original_onsets {
                    if !index.is_original_onset(note) {
                        continue;
                    }
                }
            }
            let style = paint
                .onset_styles
                .get(&note.file_id)
                .copied()
                .unwrap_or_default();
            let Some(size) = onset_marker_size(&style, zoom_y, row_height) else {
                continue;
            };
            let color = paint.file_colors.get(&note.file_id).copied().unwrap_or(tint);
            let texture = onset_textures
                .entry((note.file_id.as_str(), color))
                .or_insert_with(|| paint.textures.get(&TextureKind::Onset { style, color }))
                .clone();

            onset.visible = true;
            onset.texture = Some(texture);
            onset.rect = Rect {
                x: rect.x - size / 2.0,
                y: rect.y + rect.height / 2.0 - size / 2.0,
                width: size,
                height: size,
            };
        }
    }

    /// Rasterise visible drawables into `buffer`, whose top-left sits at `origin` in content space
    ///
    /// Onset markers are drawn after all notes so they stay on top of neighbours.
    /// Whether any note, with `margin` px of slack for its markers, touches `[left, right)`
    pub fn covers_x(&self, left: f32, right: f32, margin: f32) -> bool {
        self.notes
            .iter()
            .any(|note| note.rect.overlaps_x(left - margin, right + margin))
    }

    pub fn draw(&self, buffer: &mut PixelBuffer, origin: (f32, f32)) {
        let (ox, oy) = origin;
        let left = ox;
        let right = ox + buffer.width() as f32;

        for idx in 0..self.notes.len() {
            let note = &self.notes[idx];
            if !note.rect.overlaps_x(left, right) {
                continue;
            }
            let r = note.rect;
            buffer.fill_rect(r.x - ox, r.y - oy, r.width, r.height, note.tint, note.alpha, note.blend);

            for (overlay, tint, alpha) in [
                (&self.patterns[idx], PATTERN_TINT, PATTERN_ALPHA),
                (&self.hatches[idx], EVAL_HIGHLIGHT, HATCH_ALPHA),
            ] {
                if let (true, Some(texture)) = (overlay.visible, overlay.texture.as_deref()) {
                    let r = overlay.rect;
                    buffer.draw_texture(texture, r.x - ox, r.y - oy, r.width, r.height, tint, alpha, BlendMode::Normal);
                }
            }
        }

        for onset in &self.onsets {
            if !onset.visible || !onset.rect.overlaps_x(left, right) {
                continue;
            }
            if let Some(texture) = onset.texture.as_deref() {
                let r = onset.rect;
                buffer.draw_texture(texture, r.x - ox, r.y - oy, r.width, r.height, 0xffffff, ONSET_ALPHA, BlendMode::Normal);
            }
        }
    }
}

/// Marker edge length: preferred size scaled by vertical zoom, clamped to the row
///
/// `None` when the row is too thin to fit a visible marker.
pub fn onset_marker_size(style: &OnsetMarkerStyle, zoom_y: f32, row_height: f32) -> Option<f32> {
    let preferred = style.size.max(ONSET_MIN_PREFERRED);
    let by_row = (row_height * ONSET_ROW_FRACTION).floor();
    let size = (preferred * zoom_y).floor().max(ONSET_MIN_SIZE).min(by_row);
    (size >= 1.0).then_some(size)
}
