//! Shared colour constants for the piano roll
//!
//! Colours are kept as packed `0xRRGGBB` values because the same numbers feed
//! both the software rasteriser (composite, textures) and iced `Color`s for
//! the display-list layers.

use iced::Color;

/// Note tint that is drawn at half alpha (used for "neutral" notes in evaluation views)
pub const NEUTRAL_GRAY_NOTE: u32 = 0x444444;
pub const NEUTRAL_GRAY_ALPHA: f32 = 0.5;

// Background layer
pub const GUTTER_BACKGROUND: u32 = 0xf0f0f0;
pub const GUTTER_SEPARATOR: u32 = 0x999999;
pub const KEY_LINE: u32 = 0xcccccc;
pub const GRID_LINE: u32 = 0xe0e0e0;
pub const GRID_LABEL: u32 = 0x555555;
pub const WAVEFORM_BAND_BACKGROUND: u32 = 0x000000;
pub const WAVEFORM_ALPHA: f32 = 0.8;

// Playhead
pub const PLAYHEAD_CORE: u32 = 0xe53935;
pub const PLAYHEAD_HALO: u32 = 0xffffff;

// Loop overlay
pub const LOOP_LINE_A: u32 = 0x0284c7;
pub const LOOP_LINE_B: u32 = 0xea580c;
pub const LOOP_SHADE: u32 = 0xfde68a;
pub const LOOP_HALO: u32 = 0xffffff;

// Composite overlays
pub const OVERLAP_COLOR: u32 = 0xff0000;
pub const OVERLAP_ALPHA: f32 = 0.25;
pub const EVAL_HIGHLIGHT: u32 = 0xfacc15;
pub const PATTERN_TINT: u32 = 0x000000;

/// Per-file fallback palette when no colour is configured for a file
pub const FILE_PALETTE: [u32; 8] = [
    0x4285f4, // Blue
    0xea4335, // Red
    0x34a853, // Green
    0xfbbc05, // Amber
    0x9c27b0, // Purple
    0x00acc1, // Cyan
    0xff7043, // Deep orange
    0x8d6e63, // Brown
];

/// Unpack `0xRRGGBB` into an iced colour with the given alpha
pub fn rgb(color: u32, alpha: f32) -> Color {
    let [_, r, g, b] = color.to_be_bytes();
    Color::from_rgba8(r, g, b, alpha.clamp(0.0, 1.0))
}

/// Unpack `0xRRGGBB` into byte channels
pub fn channels(color: u32) -> [u8; 3] {
    let [_, r, g, b] = color.to_be_bytes();
    [r, g, b]
}

/// Stable palette colour for the n-th distinct file
pub fn palette_color(index: usize) -> u32 {
    FILE_PALETTE[index % FILE_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_unpacks_channels() {
        let color = rgb(0x4285f4, 1.0);
        assert!((color.r - 0x42 as f32 / 255.0).abs() < 1e-6);
        assert!((color.b - 0xf4 as f32 / 255.0).abs() < 1e-6);
        assert_eq!(channels(0x123456), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), palette_color(FILE_PALETTE.len()));
    }
}
