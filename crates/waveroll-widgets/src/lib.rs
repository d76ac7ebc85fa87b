//! Piano roll rendering engine and iced widget for waveroll
//!
//! ## Architecture (iced 0.14 patterns)
//!
//! - **Engine**: `PianoRoll` owns the viewport, content and layers. It lives in
//!   application state; mutators mark layers dirty and `render()` refreshes them.
//! - **Layers**: background, loop markers and playhead record display lists in
//!   screen space; notes, sustain and overlap regions are rasterised into offscreen
//!   composite tiles in content space, so panning only moves images.
//! - **Canvas Program**: replays the layers onto a `Frame` and turns wheel and
//!   resize events into messages through callback closures.
//! - **View function**: `piano_roll(&engine, on_wheel, on_resize)`.
//!
//! Procedural textures (hatches, file patterns, onset glyphs) are rasterised
//! once per key into a shared `TextureCache`.

pub mod canvas;
pub mod composite;
pub mod engine;
pub mod interaction;
pub mod layers;
pub mod raster;
pub mod scene;
pub mod sprites;
pub mod texture_cache;
pub mod theme;
pub mod view;

pub use canvas::{PianoRollCanvas, PianoRollInteraction};
pub use composite::{clip_rect, Composite, RedrawReason, Tile, MAX_TILE_HEIGHT, MAX_TILE_WIDTH};
pub use engine::{PianoRoll, SharedPeakSource, TimeChangeListener};
pub use interaction::{classify_wheel, WheelGesture, WheelInput, LINE_HEIGHT_PX};
pub use layers::GridSteps;
pub use raster::{BlendMode, PixelBuffer};
pub use scene::{DisplayList, Primitive};
pub use sprites::{onset_marker_size, HatchFn, NoteColorFn, NoteSpritePool};
pub use texture_cache::{HatchDirection, Texture, TextureCache, TextureKind};
pub use view::piano_roll;
