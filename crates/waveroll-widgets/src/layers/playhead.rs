//! Stationary playhead at the gutter edge, drawn last

use waveroll_core::Viewport;

use crate::scene::DisplayList;
use crate::theme::{PLAYHEAD_CORE, PLAYHEAD_HALO};

const CORE_WIDTH: f32 = 3.0;
const HALO_WIDTH: f32 = 7.0;
const HALO_ALPHA: f32 = 0.95;
const TICK_CORE_HALF: f32 = 6.0;
const TICK_HALO_HALF: f32 = 7.0;
const TICK_HALO_WIDTH: f32 = 5.0;

#[derive(Debug, Default)]
pub struct PlayheadLayer {
    list: DisplayList,
    color: Option<u32>,
}

impl PlayheadLayer {
    pub fn new(color: Option<u32>) -> Self {
        Self {
            list: DisplayList::new(),
            color,
        }
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    pub fn set_color(&mut self, color: Option<u32>) {
        self.color = color;
    }

    pub fn render(&mut self, viewport: &Viewport) {
        self.list.clear();
        let core = self.color.unwrap_or(PLAYHEAD_CORE);
        let x = viewport.playhead_x() as f32;
        let height = viewport.height() as f32;

        self.list.line((x, 0.0), (x, height), HALO_WIDTH, PLAYHEAD_HALO, HALO_ALPHA);
        self.list.line((x, 0.0), (x, height), CORE_WIDTH, core, 1.0);

        for y in [0.0, height] {
            self.list.line(
                (x - TICK_HALO_HALF, y),
                (x + TICK_HALO_HALF, y),
                TICK_HALO_WIDTH,
                PLAYHEAD_HALO,
                HALO_ALPHA,
            );
            self.list.line((x - TICK_CORE_HALF, y), (x + TICK_CORE_HALF, y), CORE_WIDTH, core, 1.0);
        }
    }
}
