//! Background layer: time grid, labels, piano-key gutter, waveform band
//!
//! Recorded in screen space, so it is re-recorded whenever pan or zoom change.
//! Work is bounded by the visible time range, not by content length, and grid
//! levels finer than a couple of pixels are thinned or dropped.

use waveroll_core::{PeakSource, Viewport};

use crate::scene::DisplayList;
use crate::theme::{
    GRID_LABEL, GRID_LINE, GUTTER_BACKGROUND, GUTTER_SEPARATOR, KEY_LINE,
    WAVEFORM_ALPHA, WAVEFORM_BAND_BACKGROUND,
};

/// Minimum horizontal distance between two time labels
const MIN_LABEL_SPACING: f32 = 50.0;
/// Grid lines further than this outside the canvas are skipped
const GRID_OVERDRAW: f32 = 10.0;
/// Closest two grid lines of one level may be drawn, in pixels
const MIN_GRID_SPACING: f64 = 2.0;
const LABEL_SIZE: f32 = 10.0;
const LABEL_BOTTOM_OFFSET: f32 = 14.0;
const MAJOR_ALPHA: f32 = 1.0;
const MINOR_ALPHA: f32 = 0.25;
const SEPARATOR_ALPHA: f32 = 0.6;
const KEY_LINE_ALPHA: f32 = 0.3;
const BAND_SEPARATOR_ALPHA: f32 = 0.5;
const BAND_BACKGROUND_ALPHA: f32 = 0.04;

/// Major and minor grid steps in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSteps {
    pub major: f64,
    pub minor: f64,
}

impl Default for GridSteps {
    fn default() -> Self {
        Self { major: 1.0, minor: 0.5 }
    }
}

#[derive(Debug, Default)]
pub struct BackgroundLayer {
    list: DisplayList,
}

impl BackgroundLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    pub fn render(&mut self, viewport: &Viewport, steps: GridSteps, peaks: Option<&dyn PeakSource>) {
        self.list.clear();
        self.draw_grid(viewport, steps);
        if viewport.gutter() > 0.0 {
            self.draw_gutter(viewport);
        }
        if let Some(peaks) = peaks {
            self.draw_waveform_band(viewport, peaks);
        }
    }

    fn draw_grid(&mut self, viewport: &Viewport, steps: GridSteps) {
        let width = viewport.width() as f32;
        let height = viewport.height() as f32;
        let pan_x = viewport.state().pan_x;
        let (t0, t1) = viewport.visible_time_range();
        let screen_x = |t: f64| (viewport.time_to_pixel(t) + pan_x) as f32;

        let pps = viewport.pixels_per_second();

        if steps.major > 0.0 && steps.major.is_finite() {
            let major = steps.major * major_stride(steps.major, pps) as f64;
            let first = (t0 / major).floor().max(0.0) as u64;
            let mut last_label_x = f32::NEG_INFINITY;
            let mut i = first;
            loop {
                let t = i as f64 * major;
                if t > t1 {
                    break;
                }
                let x = screen_x(t);
                let show_label = x - last_label_x >= MIN_LABEL_SPACING;
                if show_label {
                    last_label_x = x;
                }
                if (-GRID_OVERDRAW..=width + GRID_OVERDRAW).contains(&x) {
                    self.list.line((x, 0.0), (x, height), 1.0, GRID_LINE, MAJOR_ALPHA);
                    if show_label {
                        self.list.text(
                            format!("{:.1}s", t),
                            x + 2.0,
                            height - LABEL_BOTTOM_OFFSET,
                            LABEL_SIZE,
                            GRID_LABEL,
                        );
                    }
                }
                i += 1;
            }
        }

        // Sub-pixel subdivisions carry nothing; the level is dropped
        if steps.minor > 0.0
            && steps.minor.is_finite()
            && steps.minor < steps.major
            && steps.minor * pps >= MIN_GRID_SPACING
        {
            let eps = steps.minor / 1000.0;
            let first = (t0 / steps.minor).floor().max(0.0) as u64;
            let mut i = first;
            loop {
                let t = i as f64 * steps.minor;
                if t > t1 + eps {
                    break;
                }
                i += 1;
                if coincides_with_major(t, steps.major, eps) {
                    continue;
                }
                let x = screen_x(t);
                if (-GRID_OVERDRAW..=width + GRID_OVERDRAW).contains(&x) {
                    self.list.line((x, 0.0), (x, height), 1.0, GRID_LINE, MINOR_ALPHA);
                }
            }
        }
    }

    fn draw_gutter(&mut self, viewport: &Viewport) {
        let gutter = viewport.gutter() as f32;
        let height = viewport.height() as f32;
        let usable = viewport.usable_height() as f32;
        let pan_y = viewport.state().pan_y;

        self.list.fill_rect(0.0, 0.0, gutter, height, GUTTER_BACKGROUND, 1.0);
        self.list.line(
            (gutter + 0.5, 0.0),
            (gutter + 0.5, height),
            1.0,
            GUTTER_SEPARATOR,
            SEPARATOR_ALPHA,
        );

        let range = viewport.note_range();
        for midi in range.min..=range.max {
            let y = (viewport.pitch_to_pixel(midi as f64) + pan_y) as f32;
            if (0.0..=usable).contains(&y) {
                self.list.line((0.0, y), (gutter, y), 1.0, KEY_LINE, KEY_LINE_ALPHA);
            }
        }
    }

    /// One column per screen pixel, spanning the full width (also under the gutter)
    fn draw_waveform_band(&mut self, viewport: &Viewport, peaks: &dyn PeakSource) {
        let width = viewport.width() as f32;
        let band = viewport.band();
        let (top, band_height, mid) = (band.top as f32, band.height as f32, band.mid_y() as f32);

        self.list.line((0.0, top - 1.0), (width, top - 1.0), 1.0, GUTTER_SEPARATOR, BAND_SEPARATOR_ALPHA);
        self.list.fill_rect(0.0, top, width, band_height, WAVEFORM_BAND_BACKGROUND, BAND_BACKGROUND_ALPHA);

        let max_time = viewport.max_time();
        for column in 0..viewport.width().ceil() as u32 {
            let x = column as f32;
            let t = viewport.screen_to_time(column as f64);
            if !(0.0..=max_time).contains(&t) {
                continue;
            }
            let Some(sample) = peaks.sample_at_time(t) else {
                continue;
            };
            let amp = sample.max.clamp(0.0, 1.0).max(sample.min.clamp(0.0, 1.0));
            let half = band_height * 0.5 * amp;
            if half <= 0.0 {
                continue;
            }
            self.list.line((x, mid - half), (x, mid + half), 1.0, sample.color, WAVEFORM_ALPHA);
        }
    }
}

/// Multiple of the major step that keeps lines at least `MIN_GRID_SPACING` apart
fn major_stride(step: f64, pixels_per_second: f64) -> u64 {
    let spacing = step * pixels_per_second;
    if spacing >= MIN_GRID_SPACING || spacing <= 0.0 || !spacing.is_finite() {
        return 1;
    }
    (MIN_GRID_SPACING / spacing).ceil() as u64
}

/// Whether a minor grid time lands on a major line (within `eps`)
pub fn coincides_with_major(t: f64, major: f64, eps: f64) -> bool {
    let rem = t % major;
    rem.abs() < eps || (major - rem).abs() < eps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;
    use waveroll_core::{AudioPeakRegistry, NoteRange, PeakBuffers, RegisteredAudio, ZoomLimits};

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(800.0, 400.0, true, NoteRange::default(), ZoomLimits::default());
        vp.set_max_time(10.0);
        vp
    }

    fn grid_lines(list: &DisplayList, alpha: f32) -> Vec<f32> {
        list.primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Line { from, to, color, alpha: a, .. }
                    if *color == GRID_LINE && *a == alpha && from.0 == to.0 =>
                {
                    Some(from.0)
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_minor_lines_skip_major_positions() {
        let vp = viewport();
        let mut layer = BackgroundLayer::new();
        layer.render(&vp, GridSteps { major: 1.0, minor: 0.5 }, None);

        let majors = grid_lines(layer.display_list(), MAJOR_ALPHA);
        let minors = grid_lines(layer.display_list(), MINOR_ALPHA);
        assert_eq!(majors.len(), 11, "0s..=10s");
        assert_eq!(minors.len(), 10, "Only the half-second lines");
        for x in &minors {
            assert!(majors.iter().all(|m| (m - x).abs() > 1.0));
        }
    }

    #[test]
    fn test_tiny_steps_stay_bounded_by_width() {
        let mut vp = viewport();
        vp.set_max_time(20.0);
        let mut layer = BackgroundLayer::new();
        layer.render(&vp, GridSteps { major: 1e-5, minor: 5e-6 }, None);

        let majors = grid_lines(layer.display_list(), MAJOR_ALPHA);
        assert!(grid_lines(layer.display_list(), MINOR_ALPHA).is_empty());
        assert!(majors.len() > 100, "grid still drawn: {}", majors.len());
        for pair in majors.windows(2) {
            assert!(pair[1] - pair[0] >= MIN_GRID_SPACING as f32 - 0.01);
        }
        assert!(
            layer.display_list().len() < vp.width() as usize,
            "{} primitives for an 800px canvas",
            layer.display_list().len()
        );
    }

    #[test]
    fn test_coincidence_tolerates_float_drift() {
        assert!(coincides_with_major(0.1 * 30.0, 1.0, 1e-4));
        assert!(coincides_with_major(2.9999999, 1.0, 1e-4));
        assert!(!coincides_with_major(2.5, 1.0, 1e-4));
    }

    #[test]
    fn test_labels_keep_minimum_spacing() {
        let vp = viewport();
        let mut layer = BackgroundLayer::new();
        // 0.1s steps are ~7px apart at this zoom
        layer.render(&vp, GridSteps { major: 0.1, minor: 0.05 }, None);
        let xs: Vec<f32> = layer
            .display_list()
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        assert!(xs.len() > 1);
        for pair in xs.windows(2) {
            assert!(pair[1] - pair[0] >= MIN_LABEL_SPACING);
        }
    }

    #[test]
    fn test_waveform_band_samples_registry() {
        let vp = viewport();
        let registry = AudioPeakRegistry::new();
        registry.add_item(RegisteredAudio::new("mix", "Mix").with_color(0x123456));
        registry.set_peaks("mix", 10.0, PeakBuffers::new(vec![-0.5; 100], vec![0.5; 100]));

        let mut layer = BackgroundLayer::new();
        layer.render(&vp, GridSteps::default(), Some(&registry));
        let columns = layer
            .display_list()
            .primitives()
            .iter()
            .filter(|p| matches!(p, Primitive::Line { color: 0x123456, .. }))
            .count();
        // Screen columns mapping into [0, 10s]: from the gutter to the right edge
        assert_eq!(columns, 800 - 60);
    }

    #[test]
    fn test_missing_peaks_draw_no_columns() {
        let vp = viewport();
        let registry = AudioPeakRegistry::new();
        let mut layer = BackgroundLayer::new();
        layer.render(&vp, GridSteps::default(), Some(&registry));
        assert!(!layer
            .display_list()
            .primitives()
            .iter()
            .any(|p| matches!(p, Primitive::Line { alpha, .. } if *alpha == WAVEFORM_ALPHA)));
    }
}
