//! Wheel gesture disambiguation
//!
//! Every wheel event is classified on its own, with no mode carried between
//! events:
//!
//! ```text
//! alt held                          -> vertical zoom (pan untouched)
//! shift held, or |dx| > |dy|        -> horizontal pan
//! otherwise                         -> horizontal zoom anchored at the cursor
//! ```
//!
//! Deltas use the common wheel convention: positive y scrolls down, positive x
//! scrolls right. Negative y zooms in.

use iced::mouse::ScrollDelta;

use waveroll_core::ZOOM_STEP_FACTOR;

/// Pixels per wheel line when the device reports lines instead of pixels
pub const LINE_HEIGHT_PX: f64 = 40.0;
/// Below this a horizontal delta is treated as absent
const TRIVIAL_DELTA: f64 = 0.5;

/// A wheel event with the modifier state and cursor position it happened at
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelInput {
    pub delta_x: f64,
    pub delta_y: f64,
    pub alt: bool,
    pub shift: bool,
    /// Cursor x relative to the canvas left edge
    pub cursor_x: f64,
}

impl WheelInput {
    /// Build from an iced scroll delta (iced reports positive y for scrolling up)
    pub fn from_scroll(delta: ScrollDelta, alt: bool, shift: bool, cursor_x: f64) -> Self {
        let (delta_x, delta_y) = match delta {
            ScrollDelta::Lines { x, y } => (x as f64 * LINE_HEIGHT_PX, y as f64 * LINE_HEIGHT_PX),
            ScrollDelta::Pixels { x, y } => (x as f64, y as f64),
        };
        Self {
            delta_x: -delta_x,
            delta_y: -delta_y,
            alt,
            shift,
            cursor_x,
        }
    }
}

/// What a wheel event should do to the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelGesture {
    ZoomY { factor: f64 },
    /// Content moves by `-dx` pixels
    Pan { dx: f64 },
    ZoomX { factor: f64, anchor_x: f64 },
}

fn zoom_factor(delta_y: f64) -> f64 {
    if delta_y < 0.0 {
        ZOOM_STEP_FACTOR
    } else {
        1.0 / ZOOM_STEP_FACTOR
    }
}

/// Decide the gesture for one wheel event; `canvas_width` bounds the zoom anchor
pub fn classify_wheel(input: &WheelInput, canvas_width: f64) -> WheelGesture {
    if input.alt {
        return WheelGesture::ZoomY {
            factor: zoom_factor(input.delta_y),
        };
    }

    if input.shift || input.delta_x.abs() > input.delta_y.abs() {
        let dx = if input.delta_x.abs() > TRIVIAL_DELTA {
            input.delta_x
        } else {
            input.delta_y
        };
        return WheelGesture::Pan { dx };
    }

    WheelGesture::ZoomX {
        factor: zoom_factor(input.delta_y),
        anchor_x: input.cursor_x.clamp(0.0, canvas_width.max(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel(delta_x: f64, delta_y: f64) -> WheelInput {
        WheelInput {
            delta_x,
            delta_y,
            cursor_x: 300.0,
            ..WheelInput::default()
        }
    }

    #[test]
    fn test_vertical_wheel_zooms_time_at_cursor() {
        assert_eq!(
            classify_wheel(&wheel(0.0, -10.0), 800.0),
            WheelGesture::ZoomX {
                factor: ZOOM_STEP_FACTOR,
                anchor_x: 300.0
            }
        );
        assert_eq!(
            classify_wheel(&wheel(0.0, 10.0), 800.0),
            WheelGesture::ZoomX {
                factor: 1.0 / ZOOM_STEP_FACTOR,
                anchor_x: 300.0
            }
        );
    }

    #[test]
    fn test_alt_zooms_pitch() {
        let input = WheelInput {
            alt: true,
            shift: true,
            ..wheel(50.0, -10.0)
        };
        assert_eq!(
            classify_wheel(&input, 800.0),
            WheelGesture::ZoomY {
                factor: ZOOM_STEP_FACTOR
            }
        );
    }

    #[test]
    fn test_shift_turns_vertical_delta_into_pan() {
        let input = WheelInput {
            shift: true,
            ..wheel(0.0, 30.0)
        };
        assert_eq!(classify_wheel(&input, 800.0), WheelGesture::Pan { dx: 30.0 });
    }

    #[test]
    fn test_dominant_horizontal_delta_pans() {
        assert_eq!(classify_wheel(&wheel(-12.0, 3.0), 800.0), WheelGesture::Pan { dx: -12.0 });
        // Equal magnitudes without shift fall through to zoom
        assert!(matches!(
            classify_wheel(&wheel(5.0, 5.0), 800.0),
            WheelGesture::ZoomX { .. }
        ));
    }

    #[test]
    fn test_anchor_is_clamped_to_canvas() {
        let input = WheelInput {
            cursor_x: 1200.0,
            ..wheel(0.0, -1.0)
        };
        assert_eq!(
            classify_wheel(&input, 800.0),
            WheelGesture::ZoomX {
                factor: ZOOM_STEP_FACTOR,
                anchor_x: 800.0
            }
        );
    }

    #[test]
    fn test_scroll_conversion_flips_sign_and_scales_lines() {
        let input = WheelInput::from_scroll(ScrollDelta::Lines { x: 0.0, y: 1.0 }, false, false, 10.0);
        assert_eq!(input.delta_y, -LINE_HEIGHT_PX);
        let input = WheelInput::from_scroll(ScrollDelta::Pixels { x: -6.0, y: 0.0 }, false, true, 10.0);
        assert_eq!(input.delta_x, 6.0);
        assert!(input.shift);
    }
}
