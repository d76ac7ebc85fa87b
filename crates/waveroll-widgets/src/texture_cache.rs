//! Procedural texture cache
//!
//! Small raster patterns are drawn once and memoised by a string key built
//! from every parameter that changes their pixels:
//!
//! - **Hatch**: 12 px diagonal white lines, tiled over notes flagged by an evaluation
//! - **Pattern**: 10 px black diagonal/cross/dot fills, tiled per file
//! - **Onset**: 16 px marker glyphs, stretched to the marker size
//!
//! Entries are immutable and never evicted; the key space is bounded by the
//! style combinations actually configured.

use std::collections::HashMap;
use std::f32::consts::{FRAC_1_SQRT_2, PI};
use std::sync::{Arc, Mutex, OnceLock};

use waveroll_core::{OnsetMarkerShape, OnsetMarkerStyle, OnsetMarkerVariant, PatternKind};

use crate::raster::{coverage, distance_to_segment, on_outline, point_in_polygon};
use crate::theme::channels;

const HATCH_SIZE: u32 = 12;
const HATCH_LINE_WIDTH: f32 = 2.0;
const PATTERN_SIZE: u32 = 10;
const PATTERN_LINE_WIDTH: f32 = 1.5;
const PATTERN_DOT_RADIUS: f32 = 0.8;
const ONSET_SIZE: u32 = 16;
/// Glyph radius relative to the onset texture size
const ONSET_RADIUS_RATIO: f32 = 0.35;
const STAR_INNER_RATIO: f32 = 0.45;

/// Direction of the evaluation hatch lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HatchDirection {
    /// Bottom-left to top-right
    #[default]
    Up,
    /// Top-left to bottom-right
    Down,
}

/// What to rasterise
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureKind {
    Hatch(HatchDirection),
    Pattern(PatternKind),
    Onset { style: OnsetMarkerStyle, color: u32 },
}

impl TextureKind {
    /// Cache key covering every parameter that affects the pixels
    ///
    /// Onset size is not part of the key: glyphs are drawn at a fixed
    /// resolution and scaled per row.
    pub fn cache_key(&self) -> String {
        match self {
            TextureKind::Hatch(HatchDirection::Up) => "hatch-up".to_string(),
            TextureKind::Hatch(HatchDirection::Down) => "hatch-down".to_string(),
            TextureKind::Pattern(kind) => format!("pattern-{}", kind.as_str()),
            TextureKind::Onset { style, color } => format!(
                "onset-{}-{}-{}-#{:06x}",
                style.shape.as_str(),
                style.variant.as_str(),
                style.stroke_width,
                color & 0x00ff_ffff
            ),
        }
    }
}

/// An immutable straight-alpha RGBA8 bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// Repeat addressing: tile at native size instead of stretching
    pub repeat: bool,
}

impl Texture {
    fn blank(size: u32, repeat: bool) -> Self {
        Self {
            width: size,
            height: size,
            pixels: vec![0; size as usize * size as usize * 4],
            repeat,
        }
    }

    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Composite a solid colour over the texture wherever `inside` holds
    fn paint(&mut self, color: u32, inside: impl Fn(f32, f32) -> bool) {
        let [r, g, b] = channels(color);
        for y in 0..self.height {
            for x in 0..self.width {
                let sa = coverage(x, y, &inside);
                if sa <= 0.0 {
                    continue;
                }
                let idx = (y as usize * self.width as usize + x as usize) * 4;
                let px = &mut self.pixels[idx..idx + 4];
                let da = px[3] as f32 / 255.0;
                let out_a = sa + da * (1.0 - sa);
                for (c, src) in [r, g, b].into_iter().enumerate() {
                    let value = (src as f32 * sa + px[c] as f32 * da * (1.0 - sa)) / out_a;
                    px[c] = value.round().min(255.0) as u8;
                }
                px[3] = (out_a * 255.0).round().min(255.0) as u8;
            }
        }
    }

    /// Stroke a set of line segments
    fn stroke_segments(&mut self, color: u32, width: f32, segments: &[((f32, f32), (f32, f32))]) {
        let half = width / 2.0;
        self.paint(color, |x, y| {
            segments
                .iter()
                .any(|&(a, b)| distance_to_segment(x, y, a, b) <= half)
        });
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Memoising texture store
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: Mutex<HashMap<String, Arc<Texture>>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache shared by every engine that doesn't inject its own
    pub fn shared() -> Arc<TextureCache> {
        static SHARED: OnceLock<Arc<TextureCache>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(TextureCache::new())).clone()
    }

    /// Return the texture for `kind`, rasterising it on first use
    pub fn get(&self, kind: &TextureKind) -> Arc<Texture> {
        let key = kind.cache_key();
        match self.entries.lock() {
            Ok(mut entries) => entries
                .entry(key)
                .or_insert_with_key(|key| {
                    log::debug!("[TEXTURES] Rasterising {}", key);
                    Arc::new(rasterize(kind))
                })
                .clone(),
            Err(_) => {
                log::warn!("[TEXTURES] Cache lock poisoned, rasterising {} uncached", key);
                Arc::new(rasterize(kind))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn rasterize(kind: &TextureKind) -> Texture {
    match kind {
        TextureKind::Hatch(direction) => hatch_texture(*direction),
        TextureKind::Pattern(pattern) => pattern_texture(*pattern),
        TextureKind::Onset { style, color } => onset_texture(style, *color),
    }
}

fn hatch_texture(direction: HatchDirection) -> Texture {
    let s = HATCH_SIZE as f32;
    let mut texture = Texture::blank(HATCH_SIZE, true);
    let segments = match direction {
        HatchDirection::Up => [
            ((-2.0, s - 2.0), (s - 2.0, -2.0)),
            ((0.0, s), (s, 0.0)),
            ((2.0, s + 2.0), (s + 2.0, 2.0)),
        ],
        HatchDirection::Down => [
            ((-2.0, -2.0), (s - 2.0, s - 2.0)),
            ((0.0, 0.0), (s, s)),
            ((2.0, 2.0), (s + 2.0, s + 2.0)),
        ],
    };
    texture.stroke_segments(0xffffff, HATCH_LINE_WIDTH, &segments);
    texture
}

fn pattern_texture(kind: PatternKind) -> Texture {
    let s = PATTERN_SIZE as f32;
    let mut texture = Texture::blank(PATTERN_SIZE, true);
    match kind {
        PatternKind::Up => texture.stroke_segments(
            0x000000,
            PATTERN_LINE_WIDTH,
            &[((-2.0, s), (s, -2.0)), ((0.0, s + 2.0), (s + 2.0, 0.0))],
        ),
        PatternKind::Down => texture.stroke_segments(
            0x000000,
            PATTERN_LINE_WIDTH,
            &[((-2.0, -2.0), (s, s)), ((0.0, 0.0), (s + 2.0, s + 2.0))],
        ),
        PatternKind::Cross => texture.stroke_segments(
            0x000000,
            PATTERN_LINE_WIDTH,
            &[((s / 2.0, 0.0), (s / 2.0, s)), ((0.0, s / 2.0), (s, s / 2.0))],
        ),
        PatternKind::Dots => {
            let centers: Vec<(f32, f32)> = (0..)
                .map(|i| 2.0 + 4.0 * i as f32)
                .take_while(|v| *v < s)
                .flat_map(|y| {
                    (0..)
                        .map(|i| 2.0 + 4.0 * i as f32)
                        .take_while(|v| *v < s)
                        .map(move |x| (x, y))
                })
                .collect();
            texture.paint(0x000000, |x, y| {
                centers
                    .iter()
                    .any(|&(cx, cy)| (x - cx).powi(2) + (y - cy).powi(2) <= PATTERN_DOT_RADIUS.powi(2))
            });
        }
    }
    texture
}

// =============================================================================
// Onset glyphs
// =============================================================================

enum Glyph {
    Circle(f32),
    Polygon(Vec<(f32, f32)>),
    Strokes(Vec<((f32, f32), (f32, f32))>),
}

fn glyph(shape: OnsetMarkerShape, cx: f32, cy: f32, r: f32) -> Glyph {
    let regular = |n: usize, phase: f32| -> Vec<(f32, f32)> {
        (0..n)
            .map(|i| {
                let a = 2.0 * PI / n as f32 * i as f32 + phase;
                (cx + a.cos() * r, cy + a.sin() * r)
            })
            .collect()
    };
    let h = 0.866;

    match shape {
        OnsetMarkerShape::Circle => Glyph::Circle(r),
        OnsetMarkerShape::Square => {
            let d = r * FRAC_1_SQRT_2;
            Glyph::Polygon(vec![(cx - d, cy - d), (cx + d, cy - d), (cx + d, cy + d), (cx - d, cy + d)])
        }
        OnsetMarkerShape::Diamond => {
            Glyph::Polygon(vec![(cx, cy - r), (cx + r, cy), (cx, cy + r), (cx - r, cy)])
        }
        OnsetMarkerShape::TriangleUp => Glyph::Polygon(vec![
            (cx, cy - r),
            (cx + r * h, cy + r * 0.5),
            (cx - r * h, cy + r * 0.5),
        ]),
        OnsetMarkerShape::TriangleDown => Glyph::Polygon(vec![
            (cx - r * h, cy - r * 0.5),
            (cx + r * h, cy - r * 0.5),
            (cx, cy + r),
        ]),
        OnsetMarkerShape::TriangleLeft => Glyph::Polygon(vec![
            (cx + r, cy - r * h * 0.5),
            (cx + r, cy + r * h * 0.5),
            (cx - r, cy),
        ]),
        OnsetMarkerShape::TriangleRight => Glyph::Polygon(vec![
            (cx - r, cy - r * h * 0.5),
            (cx - r, cy + r * h * 0.5),
            (cx + r, cy),
        ]),
        OnsetMarkerShape::Star => {
            let spikes = 5;
            Glyph::Polygon(
                (0..spikes * 2)
                    .map(|i| {
                        let a = i as f32 * PI / spikes as f32 - PI / 2.0;
                        let rad = if i % 2 == 0 { r } else { r * STAR_INNER_RATIO };
                        (cx + a.cos() * rad, cy + a.sin() * rad)
                    })
                    .collect(),
            )
        }
        OnsetMarkerShape::Cross => Glyph::Strokes(vec![
            ((cx - r, cy - r), (cx + r, cy + r)),
            ((cx + r, cy - r), (cx - r, cy + r)),
        ]),
        OnsetMarkerShape::Plus => Glyph::Strokes(vec![
            ((cx - r, cy), (cx + r, cy)),
            ((cx, cy - r), (cx, cy + r)),
        ]),
        OnsetMarkerShape::Hexagon => Glyph::Polygon(regular(6, PI / 6.0)),
        OnsetMarkerShape::Pentagon => Glyph::Polygon(regular(5, -PI / 2.0)),
        OnsetMarkerShape::ChevronUp => Glyph::Polygon(vec![
            (cx - r, cy + r * 0.4),
            (cx, cy - r * 0.6),
            (cx + r, cy + r * 0.4),
        ]),
        OnsetMarkerShape::ChevronDown => Glyph::Polygon(vec![
            (cx - r, cy - r * 0.4),
            (cx, cy + r * 0.6),
            (cx + r, cy - r * 0.4),
        ]),
    }
}

/// Filled glyphs get a white interior under a coloured outline
fn onset_texture(style: &OnsetMarkerStyle, color: u32) -> Texture {
    let s = ONSET_SIZE as f32;
    let (cx, cy) = (s / 2.0, s / 2.0);
    let r = s * ONSET_RADIUS_RATIO;
    let stroke = style.stroke_width.max(1.0);
    let filled = style.variant == OnsetMarkerVariant::Filled;
    let mut texture = Texture::blank(ONSET_SIZE, false);

    match glyph(style.shape, cx, cy, r) {
        Glyph::Circle(radius) => {
            let dist = move |x: f32, y: f32| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            if filled {
                texture.paint(0xffffff, |x, y| dist(x, y) <= radius);
            }
            texture.paint(color, |x, y| (dist(x, y) - radius).abs() <= stroke / 2.0);
        }
        Glyph::Polygon(points) => {
            if filled {
                texture.paint(0xffffff, |x, y| point_in_polygon(&points, x, y));
            }
            texture.paint(color, |x, y| on_outline(&points, x, y, stroke));
        }
        Glyph::Strokes(segments) => texture.stroke_segments(color, stroke, &segments),
    }
    texture
}
