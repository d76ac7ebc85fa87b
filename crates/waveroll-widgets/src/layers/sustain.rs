//! Sustain pedal regions, painted into the composite under nothing but the notes
//!
//! Regions span the full buffer height and are drawn in content space; the
//! composite applies pan when it blits.

use std::collections::HashMap;

use waveroll_core::{extract_sustain_segments, ControlChangeEvent, Note, SustainSegment, Viewport};

use crate::raster::{BlendMode, PixelBuffer};
use crate::theme::palette_color;

pub const SUSTAIN_ALPHA: f32 = 0.2;

#[derive(Debug, Default)]
pub struct SustainLayer {
    segments: Vec<SustainSegment>,
    /// Palette slot per file, in order of first appearance
    file_order: HashMap<String, usize>,
}

impl SustainLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[SustainSegment] {
        &self.segments
    }

    /// Re-extract segments from control changes; unterminated pedals end at the last note
    pub fn rebuild(&mut self, events: &[ControlChangeEvent], notes: &[Note]) {
        self.segments = extract_sustain_segments(events, notes);
        self.file_order.clear();
        for segment in &self.segments {
            let next = self.file_order.len();
            self.file_order.entry(segment.file_id.clone()).or_insert(next);
        }
        log::debug!("[SUSTAIN] {} segments across {} files", self.segments.len(), self.file_order.len());
    }

    pub fn covers_x(&self, viewport: &Viewport, left: f64, right: f64) -> bool {
        self.segments.iter().any(|segment| {
            segment.end > segment.start
                && viewport.time_to_pixel(segment.end) >= left
                && viewport.time_to_pixel(segment.start) < right
        })
    }

    pub fn draw(
        &self,
        buffer: &mut PixelBuffer,
        viewport: &Viewport,
        origin: (f32, f32),
        file_colors: &HashMap<String, u32>,
    ) {
        let (ox, _) = origin;
        let height = buffer.height() as f32;
        for segment in &self.segments {
            if segment.end <= segment.start {
                continue;
            }
            let color = file_colors.get(&segment.file_id).copied().unwrap_or_else(|| {
                palette_color(self.file_order.get(&segment.file_id).copied().unwrap_or(0))
            });
            let x = viewport.time_to_pixel(segment.start) as f32 - ox;
            let width = viewport.duration_to_pixels(segment.end - segment.start) as f32;
            buffer.fill_rect(x, 0.0, width, height, color, SUSTAIN_ALPHA, BlendMode::Normal);
        }
    }
}
