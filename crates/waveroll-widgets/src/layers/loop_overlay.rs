//! A/B loop markers
//!
//! Both markers are dashed with different patterns so they stay tellable apart
//! when they overlap. The shaded region is only drawn when both bounds are set.

use waveroll_core::{LoopWindow, Viewport};

use crate::scene::DisplayList;
use crate::theme::{LOOP_HALO, LOOP_LINE_A, LOOP_LINE_B, LOOP_SHADE};

const CORE_WIDTH: f32 = 3.0;
const HALO_WIDTH: f32 = CORE_WIDTH + 2.0;
const HALO_ALPHA: f32 = 0.95;
const SHADE_ALPHA: f32 = 0.22;
const LABEL_SIZE: f32 = 11.0;

/// (dash, gap) lengths in pixels
const DASH_A: (f32, f32) = (14.0, 8.0);
const DASH_B: (f32, f32) = (2.0, 4.0);

#[derive(Debug, Default)]
pub struct LoopOverlayLayer {
    list: DisplayList,
}

impl LoopOverlayLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    pub fn render(&mut self, viewport: &Viewport, window: LoopWindow) {
        self.list.clear();
        if window.is_empty() {
            return;
        }
        let height = viewport.height() as f32;
        let pan_x = viewport.state().pan_x;
        let screen_x = |t: f64| (viewport.time_to_pixel(t) + pan_x) as f32;

        let start_x = window.start.map(screen_x);
        let end_x = window.end.map(screen_x);

        // Shade sits under both markers
        if let (Some(a), Some(b)) = (start_x, end_x) {
            self.list.fill_rect(a, 0.0, (b - a).max(0.0), height, LOOP_SHADE, SHADE_ALPHA);
        }

        if let (Some(t), Some(x)) = (window.start, start_x) {
            self.marker(x, height, LOOP_LINE_A, DASH_A, format!("A({:.1}s)", t));
        }
        if let (Some(t), Some(x)) = (window.end, end_x) {
            self.marker(x, height, LOOP_LINE_B, DASH_B, format!("B({:.1}s)", t));
        }
    }

    fn marker(&mut self, x: f32, height: f32, color: u32, (dash, gap): (f32, f32), label: String) {
        let mut y = 0.0;
        while y < height {
            let y2 = (y + dash).min(height);
            self.list.line((x, y), (x, y2), HALO_WIDTH, LOOP_HALO, HALO_ALPHA);
            self.list.line((x, y), (x, y2), CORE_WIDTH, color, 1.0);
            y = y2 + gap;
        }
        self.list.text(label, x + 2.0, 0.0, LABEL_SIZE, color);
    }
}
