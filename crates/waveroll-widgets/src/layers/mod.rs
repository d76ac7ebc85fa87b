//! Visual layers, back to front
//!
//! ```text
//! background  (screen-space display list)
//! composite   notes -> sustain -> overlap   (offscreen buffer, see composite.rs)
//! loop        (screen-space display list)
//! playhead    (screen-space display list)
//! ```

mod background;
mod loop_overlay;
mod overlap;
mod playhead;
mod sustain;

pub use background::{coincides_with_major, BackgroundLayer, GridSteps};
pub use loop_overlay::LoopOverlayLayer;
pub use overlap::OverlapLayer;
pub use playhead::PlayheadLayer;
pub use sustain::{SustainLayer, SUSTAIN_ALPHA};
