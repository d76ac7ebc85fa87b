//! Overlap regions: translucent red bands over time intervals where files disagree

use waveroll_core::{NoteInterval, Viewport};

use crate::raster::{BlendMode, PixelBuffer};
use crate::theme::{OVERLAP_ALPHA, OVERLAP_COLOR};

#[derive(Debug, Default)]
pub struct OverlapLayer {
    regions: Vec<NoteInterval>,
}

impl OverlapLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> &[NoteInterval] {
        &self.regions
    }

    pub fn set_regions(&mut self, regions: Vec<NoteInterval>) {
        self.regions = regions;
    }

    pub fn covers_x(&self, viewport: &Viewport, left: f64, right: f64) -> bool {
        self.regions.iter().any(|region| {
            region.end > region.start
                && viewport.time_to_pixel(region.end) >= left
                && viewport.time_to_pixel(region.start) < right
        })
    }

    pub fn draw(&self, buffer: &mut PixelBuffer, viewport: &Viewport, origin: (f32, f32)) {
        let height = buffer.height() as f32;
        for region in &self.regions {
            if !(region.end > region.start) {
                continue;
            }
            let x = viewport.time_to_pixel(region.start) as f32 - origin.0;
            let width = viewport.duration_to_pixels(region.end - region.start) as f32;
            buffer.fill_rect(x, 0.0, width, height, OVERLAP_COLOR, OVERLAP_ALPHA, BlendMode::Normal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waveroll_core::{NoteRange, ZoomLimits};

    #[test]
    fn test_regions_respect_buffer_origin() {
        let mut vp = Viewport::new(100.0, 100.0, false, NoteRange::default(), ZoomLimits::default());
        vp.set_max_time(10.0);
        let mut layer = OverlapLayer::new();
        layer.set_regions(vec![NoteInterval { start: 5.0, end: 6.0 }]);

        // Window starting at content x = 40: the region lands at [10, 20)
        let mut buffer = PixelBuffer::new(40, 4);
        layer.draw(&mut buffer, &vp, (40.0, 0.0));
        assert_eq!(buffer.straight_pixel(15, 2).unwrap()[0], 255);
        assert_eq!(buffer.pixel(5, 2).unwrap()[3], 0);
        assert_eq!(buffer.pixel(25, 2).unwrap()[3], 0);
    }
}
