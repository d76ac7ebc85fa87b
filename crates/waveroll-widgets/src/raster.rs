//! Software rasteriser for the offscreen composite and procedural textures
//!
//! `PixelBuffer` stores premultiplied RGBA8 so that both normal (source-over)
//! and additive blending are a single multiply-add per channel. It is only
//! converted to straight alpha when handed to iced as an image.
//!
//! Shape coverage for textures is computed by 4x4 supersampling of an
//! inside-test, which is plenty for 10-16 px glyphs.

use crate::texture_cache::Texture;
use crate::theme::channels;

/// How a source colour combines with what is already in the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Source-over
    #[default]
    Normal,
    /// Colours add up (overlapping notes of different files mix towards white)
    Add,
}

// =============================================================================
// Pixel buffer
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    /// Premultiplied RGBA, 4 bytes per pixel
    pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Reallocate when the size differs; returns true if it did
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 4];
        true
    }

    /// Clear to fully transparent
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Drop the backing storage
    pub fn release(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels = Vec::new();
    }

    /// Premultiplied RGBA at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ])
    }

    /// Straight-alpha RGBA at (x, y)
    pub fn straight_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixel(x, y).map(unpremultiply)
    }

    /// Straight-alpha copy of the whole buffer, as expected by image handles
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len());
        for px in self.pixels.chunks_exact(4) {
            out.extend_from_slice(&unpremultiply([px[0], px[1], px[2], px[3]]));
        }
        out
    }

    #[inline]
    fn blend(&mut self, idx: usize, src: [f32; 3], alpha: f32, mode: BlendMode) {
        if alpha <= 0.0 {
            return;
        }
        let px = &mut self.pixels[idx..idx + 4];
        match mode {
            BlendMode::Normal => {
                let keep = 1.0 - alpha;
                for c in 0..3 {
                    let value = src[c] * alpha * 255.0 + px[c] as f32 * keep;
                    px[c] = value.round().min(255.0) as u8;
                }
                px[3] = (alpha * 255.0 + px[3] as f32 * keep).round().min(255.0) as u8;
            }
            BlendMode::Add => {
                for c in 0..3 {
                    let value = src[c] * alpha * 255.0 + px[c] as f32;
                    px[c] = value.round().min(255.0) as u8;
                }
                px[3] = (alpha * 255.0 + px[3] as f32).round().min(255.0) as u8;
            }
        }
    }

    /// Fill an axis-aligned rectangle; any positive extent covers at least one pixel
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: u32, alpha: f32, mode: BlendMode) {
        let (Some((x0, x1)), Some((y0, y1))) = (span(x, w, self.width), span(y, h, self.height)) else {
            return;
        };
        let [r, g, b] = channels(color);
        let src = [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0];
        let alpha = alpha.clamp(0.0, 1.0);
        let stride = self.width as usize;
        for py in y0..y1 {
            let row = py as usize * stride;
            for px in x0..x1 {
                self.blend((row + px as usize) * 4, src, alpha, mode);
            }
        }
    }

    /// Draw a texture into a rectangle
    ///
    /// Repeat-addressed textures tile from the rectangle's origin at their
    /// native size; others are stretched (nearest neighbour). Texel colours
    /// are multiplied by `tint`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_texture(
        &mut self,
        texture: &Texture,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        tint: u32,
        alpha: f32,
        mode: BlendMode,
    ) {
        if texture.width == 0 || texture.height == 0 {
            return;
        }
        let (Some((x0, x1)), Some((y0, y1))) = (span(x, w, self.width), span(y, h, self.height)) else {
            return;
        };
        let [tr, tg, tb] = channels(tint);
        let tint = [tr as f32 / 255.0, tg as f32 / 255.0, tb as f32 / 255.0];
        let alpha = alpha.clamp(0.0, 1.0);
        let stride = self.width as usize;

        for py in y0..y1 {
            let v = py as f32 + 0.5 - y;
            let ty = texel_coord(v, h, texture.height, texture.repeat);
            let row = py as usize * stride;
            for px in x0..x1 {
                let u = px as f32 + 0.5 - x;
                let tx = texel_coord(u, w, texture.width, texture.repeat);
                let texel = texture.texel(tx, ty);
                if texel[3] == 0 {
                    continue;
                }
                let src = [
                    texel[0] as f32 / 255.0 * tint[0],
                    texel[1] as f32 / 255.0 * tint[1],
                    texel[2] as f32 / 255.0 * tint[2],
                ];
                self.blend((row + px as usize) * 4, src, texel[3] as f32 / 255.0 * alpha, mode);
            }
        }
    }
}

/// Integer pixel range `[start, end)` for a float span, clipped to `[0, limit)`
fn span(start: f32, len: f32, limit: u32) -> Option<(u32, u32)> {
    if !(len > 0.0) || !start.is_finite() || !len.is_finite() {
        return None;
    }
    let a = start.round();
    let mut b = (start + len).round();
    if b <= a {
        b = a + 1.0;
    }
    let a = a.max(0.0);
    let b = b.min(limit as f32);
    (a < b).then_some((a as u32, b as u32))
}

fn texel_coord(offset: f32, extent: f32, size: u32, repeat: bool) -> u32 {
    if repeat {
        (offset.floor() as i64).rem_euclid(size as i64) as u32
    } else {
        let t = (offset / extent * size as f32).floor();
        t.clamp(0.0, (size - 1) as f32) as u32
    }
}

fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = px[3];
    if a == 0 {
        return [0, 0, 0, 0];
    }
    if a == 255 {
        return px;
    }
    let scale = 255.0 / a as f32;
    [
        (px[0] as f32 * scale).round().min(255.0) as u8,
        (px[1] as f32 * scale).round().min(255.0) as u8,
        (px[2] as f32 * scale).round().min(255.0) as u8,
        a,
    ]
}

// =============================================================================
// Coverage helpers (procedural textures)
// =============================================================================

const SUBSAMPLES: u32 = 4;

/// Fraction of pixel (x, y) for which `inside` holds, 4x4 supersampled
pub fn coverage(x: u32, y: u32, inside: impl Fn(f32, f32) -> bool) -> f32 {
    let step = 1.0 / SUBSAMPLES as f32;
    let mut hits = 0;
    for sy in 0..SUBSAMPLES {
        for sx in 0..SUBSAMPLES {
            let px = x as f32 + (sx as f32 + 0.5) * step;
            let py = y as f32 + (sy as f32 + 0.5) * step;
            if inside(px, py) {
                hits += 1;
            }
        }
    }
    hits as f32 / (SUBSAMPLES * SUBSAMPLES) as f32
}

/// Even-odd point-in-polygon test
pub fn point_in_polygon(points: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = points.len().wrapping_sub(1);
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from (x, y) to the segment a-b
pub fn distance_to_segment(x: f32, y: f32, a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (((x - a.0) * dx + (y - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (px, py) = (a.0 + t * dx, a.1 + t * dy);
    ((x - px).powi(2) + (y - py).powi(2)).sqrt()
}

/// Whether (x, y) lies within `width / 2` of the closed outline through `points`
pub fn on_outline(points: &[(f32, f32)], x: f32, y: f32, width: f32) -> bool {
    let half = width / 2.0;
    (0..points.len()).any(|i| {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        distance_to_segment(x, y, a, b) <= half
    })
}
