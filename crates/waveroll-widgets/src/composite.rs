//! Offscreen composite for notes, sustain and overlap regions
//!
//! Everything in the composite is rasterised into pan-free content space and
//! handed to iced as images. On a pan-only frame nothing is rasterised: only
//! the blit position moves.
//!
//! ```text
//!   content space (full extent)
//!   +------+------+------+--
//!   | tile | tile | tile |     each <= 4096 x 2048, blitted at origin + pan,
//!   +------+------+------+--   clipped to [gutter..width] x [0..usable]
//! ```
//!
//! A full re-render happens when content is marked dirty, a redraw is forced,
//! either zoom changed, or the width or usable height changed. Tiles with
//! nothing in them are skipped.

use std::collections::HashMap;
use std::fmt;

use iced::widget::image;
use iced::Rectangle;
use waveroll_core::Viewport;

use crate::layers::{OverlapLayer, SustainLayer};
use crate::raster::PixelBuffer;
use crate::sprites::NoteSpritePool;

pub const MAX_TILE_WIDTH: u32 = 4096;
pub const MAX_TILE_HEIGHT: u32 = 2048;
/// Extra room past the last note so onset markers at the edge are not cut
const EDGE_MARGIN: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawReason {
    Initial,
    Content,
    Forced,
    Zoom,
    Resize,
}

impl fmt::Display for RedrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RedrawReason::Initial => "initial",
            RedrawReason::Content => "content changed",
            RedrawReason::Forced => "forced",
            RedrawReason::Zoom => "zoom changed",
            RedrawReason::Resize => "viewport resized",
        };
        f.write_str(s)
    }
}

/// Layers that paint into the composite, borrowed for one re-render
pub struct CompositeSources<'a> {
    pub sprites: &'a NoteSpritePool,
    pub sustain: &'a SustainLayer,
    pub overlap: &'a OverlapLayer,
    pub file_colors: &'a HashMap<String, u32>,
}

impl CompositeSources<'_> {
    /// Whether anything paints into the content columns `[left, right)`
    fn covers_x(&self, viewport: &Viewport, left: f64, right: f64) -> bool {
        self.sprites.covers_x(left as f32, right as f32, EDGE_MARGIN as f32)
            || self.sustain.covers_x(viewport, left, right)
            || self.overlap.covers_x(viewport, left, right)
    }
}

/// Axis-aligned span helper in content space
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    start: f64,
    end: f64,
}

impl Span {
    fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// One rasterised piece of the content extent
#[derive(Debug, Clone)]
pub struct Tile {
    /// Content-space position of the tile's top-left pixel
    pub origin: (f64, f64),
    pub width: u32,
    pub height: u32,
    pub handle: image::Handle,
}

impl Tile {
    /// Screen rectangle for the current pan
    pub fn blit_rect(&self, viewport: &Viewport) -> Rectangle {
        let state = viewport.state();
        Rectangle {
            x: (self.origin.0 + state.pan_x) as f32,
            y: (self.origin.1 + state.pan_y) as f32,
            width: self.width as f32,
            height: self.height as f32,
        }
    }
}

#[derive(Debug, Default)]
pub struct Composite {
    /// Scratch raster reused for every tile
    scratch: PixelBuffer,
    tiles: Vec<Tile>,
    /// Content-space bounds covered by the last re-render
    extent: Option<(Span, Span)>,
    last_zoom: Option<(f64, f64)>,
    last_size: Option<(f64, f64)>,
    content_dirty: bool,
    force: bool,
    redraw_count: u64,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes, sustain or overlap data changed
    pub fn mark_content_dirty(&mut self) {
        self.content_dirty = true;
    }

    pub fn force_redraw(&mut self) {
        self.force = true;
    }

    /// Number of full re-renders so far
    pub fn redraw_count(&self) -> u64 {
        self.redraw_count
    }

    /// Non-empty tiles of the last full re-render
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn is_rendered(&self) -> bool {
        self.extent.is_some()
    }

    /// Why a full re-render is needed for this viewport, if at all
    pub fn redraw_reason(&self, viewport: &Viewport) -> Option<RedrawReason> {
        let state = viewport.state();
        let zoom = (state.zoom_x, state.zoom_y);
        let size = (viewport.width(), viewport.usable_height());

        if self.extent.is_none() || self.last_zoom.is_none() {
            return Some(RedrawReason::Initial);
        }
        if self.content_dirty {
            return Some(RedrawReason::Content);
        }
        if self.force {
            return Some(RedrawReason::Forced);
        }
        if self.last_zoom != Some(zoom) {
            return Some(RedrawReason::Zoom);
        }
        if self.last_size != Some(size) {
            return Some(RedrawReason::Resize);
        }
        None
    }

    /// Re-render when needed; returns whether a full re-render happened
    pub fn prepare(&mut self, viewport: &Viewport, sources: &CompositeSources<'_>) -> bool {
        let Some(reason) = self.redraw_reason(viewport) else {
            return false;
        };
        self.render(viewport, sources, reason);
        true
    }

    fn render(&mut self, viewport: &Viewport, sources: &CompositeSources<'_>, reason: RedrawReason) {
        let (extent_x, extent_y) = content_extent(viewport);
        let total_w = extent_x.len().ceil().max(1.0) as u32;
        let total_h = extent_y.len().ceil().max(1.0) as u32;

        self.tiles.clear();
        let mut skipped = 0usize;
        for ty in 0..total_h.div_ceil(MAX_TILE_HEIGHT) {
            let top = ty * MAX_TILE_HEIGHT;
            let height = MAX_TILE_HEIGHT.min(total_h - top);
            for tx in 0..total_w.div_ceil(MAX_TILE_WIDTH) {
                let left = tx * MAX_TILE_WIDTH;
                let width = MAX_TILE_WIDTH.min(total_w - left);
                let origin = (extent_x.start + left as f64, extent_y.start + top as f64);

                if !sources.covers_x(viewport, origin.0, origin.0 + width as f64) {
                    skipped += 1;
                    continue;
                }
                let handle = self.rasterise(viewport, sources, origin, width, height);
                self.tiles.push(Tile {
                    origin,
                    width,
                    height,
                    handle,
                });
            }
        }

        self.extent = Some((extent_x, extent_y));
        let state = viewport.state();
        self.last_zoom = Some((state.zoom_x, state.zoom_y));
        self.last_size = Some((viewport.width(), viewport.usable_height()));
        self.content_dirty = false;
        self.force = false;
        self.redraw_count += 1;

        log::debug!(
            "[COMPOSITE] Full re-render #{} ({}): {}x{} at ({:.0}, {:.0}), {} tiles, {} empty",
            self.redraw_count,
            reason,
            total_w,
            total_h,
            extent_x.start,
            extent_y.start,
            self.tiles.len(),
            skipped
        );
    }

    fn rasterise(
        &mut self,
        viewport: &Viewport,
        sources: &CompositeSources<'_>,
        origin: (f64, f64),
        width: u32,
        height: u32,
    ) -> image::Handle {
        self.scratch.resize(width, height);
        self.scratch.clear();

        let origin = (origin.0 as f32, origin.1 as f32);
        sources.sprites.draw(&mut self.scratch, origin);
        sources
            .sustain
            .draw(&mut self.scratch, viewport, origin, sources.file_colors);
        sources.overlap.draw(&mut self.scratch, viewport, origin);

        image::Handle::from_rgba(width, height, self.scratch.to_straight_rgba())
    }

    /// Screen rectangle of the whole rendered extent for the current pan
    pub fn blit_rect(&self, viewport: &Viewport) -> Option<Rectangle> {
        let (x, y) = self.extent?;
        let state = viewport.state();
        Some(Rectangle {
            x: (x.start + state.pan_x) as f32,
            y: (y.start + state.pan_y) as f32,
            width: x.len().ceil() as f32,
            height: y.len().ceil() as f32,
        })
    }

    /// Tiles intersecting the timeline area, with their screen rectangles
    pub fn visible_tiles<'a>(
        &'a self,
        viewport: &'a Viewport,
    ) -> impl Iterator<Item = (&'a Tile, Rectangle)> + 'a {
        let clip = clip_rect(viewport);
        self.tiles
            .iter()
            .map(move |tile| (tile, tile.blit_rect(viewport)))
            .filter(move |(_, rect)| rect.intersects(&clip))
    }

    /// Free the tiles and scratch raster; safe to call more than once
    pub fn release(&mut self) {
        if self.extent.is_none() && self.tiles.is_empty() && self.scratch.is_empty() {
            return;
        }
        self.scratch.release();
        self.tiles.clear();
        self.tiles.shrink_to_fit();
        self.extent = None;
        self.last_zoom = None;
        self.last_size = None;
        log::debug!("[COMPOSITE] Released offscreen tiles");
    }
}

/// Screen area the composite is visible in: right of the gutter, above the waveform band
pub fn clip_rect(viewport: &Viewport) -> Rectangle {
    let gutter = viewport.gutter() as f32;
    Rectangle {
        x: gutter,
        y: 0.0,
        width: (viewport.width() as f32 - gutter).max(0.0),
        height: viewport.usable_height() as f32,
    }
}

/// Content-space bounds of everything the composite can paint
fn content_extent(viewport: &Viewport) -> (Span, Span) {
    let x = Span {
        start: 0.0,
        end: viewport.time_to_pixel(viewport.max_time()) + EDGE_MARGIN,
    };
    let range = viewport.note_range();
    let half_row = viewport.row_height() / 2.0;
    let top = viewport.pitch_to_pixel(range.min as f64 + range.span() as f64) - half_row;
    let bottom = viewport.pitch_to_pixel(range.min as f64) + half_row;
    let y = Span {
        start: top.min(0.0),
        end: bottom.max(viewport.usable_height()),
    };
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waveroll_core::{NoteInterval, NoteRange, ZoomLimits};

    struct Fixture {
        sprites: NoteSpritePool,
        sustain: SustainLayer,
        overlap: OverlapLayer,
        file_colors: HashMap<String, u32>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sprites: NoteSpritePool::new(),
                sustain: SustainLayer::new(),
                overlap: OverlapLayer::new(),
                file_colors: HashMap::new(),
            }
        }

        fn sources(&self) -> CompositeSources<'_> {
            CompositeSources {
                sprites: &self.sprites,
                sustain: &self.sustain,
                overlap: &self.overlap,
                file_colors: &self.file_colors,
            }
        }
    }

    fn viewport(max_time: f64) -> Viewport {
        let mut vp = Viewport::new(800.0, 400.0, true, NoteRange::default(), ZoomLimits::default());
        vp.set_max_time(max_time);
        vp
    }

    #[test]
    fn test_pan_only_never_rerenders() {
        let fixture = Fixture::new();
        let mut vp = viewport(60.0);
        let mut composite = Composite::new();
        assert!(composite.prepare(&vp, &fixture.sources()));
        assert_eq!(composite.redraw_count(), 1);

        let mut positions = Vec::new();
        for step in 0..20 {
            vp.pan_by(-25.0, 0.0);
            assert!(!composite.prepare(&vp, &fixture.sources()), "pan step {} re-rendered", step);
            positions.push(composite.blit_rect(&vp).unwrap().x);
        }
        assert_eq!(composite.redraw_count(), 1);
        assert!(positions.windows(2).all(|w| w[1] < w[0]), "blit should move left");
    }

    #[test]
    fn test_zoom_content_and_resize_trigger_rerender() {
        let fixture = Fixture::new();
        let mut vp = viewport(60.0);
        let mut composite = Composite::new();
        composite.prepare(&vp, &fixture.sources());

        vp.zoom_x(1.1, None);
        assert_eq!(composite.redraw_reason(&vp), Some(RedrawReason::Zoom));
        composite.prepare(&vp, &fixture.sources());

        composite.mark_content_dirty();
        assert_eq!(composite.redraw_reason(&vp), Some(RedrawReason::Content));
        composite.prepare(&vp, &fixture.sources());

        composite.force_redraw();
        assert_eq!(composite.redraw_reason(&vp), Some(RedrawReason::Forced));
        composite.prepare(&vp, &fixture.sources());

        vp.set_size(900.0, 400.0);
        assert_eq!(composite.redraw_reason(&vp), Some(RedrawReason::Resize));
        composite.prepare(&vp, &fixture.sources());

        assert_eq!(composite.redraw_count(), 5);
        assert_eq!(composite.redraw_reason(&vp), None);
    }

    #[test]
    fn test_wide_content_is_tiled_and_pans_without_rerender() {
        let mut fixture = Fixture::new();
        fixture.overlap.set_regions(vec![NoteInterval { start: 0.0, end: 120.0 }]);
        // The 740px timeline holds all 120 s at zoom 1; at zoom 10 the extent is
        // 60 + 7400 + 16 px wide
        let mut vp = viewport(120.0);
        vp.zoom_x(10.0, None);
        let mut composite = Composite::new();
        composite.prepare(&vp, &fixture.sources());

        let tiles = composite.tiles();
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().all(|t| t.width <= MAX_TILE_WIDTH && t.height <= MAX_TILE_HEIGHT));
        assert_eq!(tiles[0].width, MAX_TILE_WIDTH);
        assert_eq!(tiles[1].origin.0 - tiles[0].origin.0, MAX_TILE_WIDTH as f64);
        let total: u32 = tiles.iter().map(|t| t.width).sum();
        assert!((7476..=7477).contains(&total), "tiled width {}", total);

        // Jumping across tiles is still a pure blit
        vp.set_time(100.0);
        assert_eq!(composite.redraw_reason(&vp), None);
        let clip = clip_rect(&vp);
        let visible: Vec<_> = composite.visible_tiles(&vp).collect();
        assert!(!visible.is_empty());
        let left = visible.iter().map(|(_, r)| r.x).fold(f32::INFINITY, f32::min);
        let right = visible.iter().map(|(_, r)| r.x + r.width).fold(f32::NEG_INFINITY, f32::max);
        assert!(left <= clip.x && right >= clip.x + clip.width);
        assert_eq!(composite.redraw_count(), 1);
    }

    #[test]
    fn test_empty_columns_are_not_rasterised() {
        let mut fixture = Fixture::new();
        fixture.overlap.set_regions(vec![NoteInterval { start: 1.0, end: 2.0 }]);
        let mut vp = viewport(120.0);
        vp.zoom_x(10.0, None);
        let mut composite = Composite::new();
        composite.prepare(&vp, &fixture.sources());

        assert_eq!(composite.tiles().len(), 1);
        assert_eq!(composite.tiles()[0].origin.0, 0.0);
        assert!(composite.is_rendered());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut fixture = Fixture::new();
        fixture.overlap.set_regions(vec![NoteInterval { start: 0.0, end: 5.0 }]);
        let vp = viewport(10.0);
        let mut composite = Composite::new();
        composite.prepare(&vp, &fixture.sources());
        assert_eq!(composite.tiles().len(), 1);

        composite.release();
        composite.release();
        assert!(composite.tiles().is_empty());
        assert!(!composite.is_rendered());
        assert!(composite.blit_rect(&vp).is_none());
        assert_eq!(composite.redraw_reason(&vp), Some(RedrawReason::Initial));
    }

    #[test]
    fn test_clip_rect_excludes_gutter_and_band() {
        let vp = viewport(10.0);
        let clip = clip_rect(&vp);
        assert_eq!(clip.x, 60.0);
        assert_eq!(clip.width, 740.0);
        assert_eq!(clip.height, vp.usable_height() as f32);
    }
}
