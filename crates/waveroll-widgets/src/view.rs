//! Piano roll view function
//!
//! ## Usage
//!
//! ```ignore
//! fn update(&mut self, message: Message) {
//!     match message {
//!         Message::Wheel(input) => { self.roll.handle_wheel(input); }
//!         Message::Resized(w, h) => self.roll.resize(w as f64, h as f64),
//!     }
//!     self.roll.render();
//! }
//!
//! fn view(&self) -> Element<Message> {
//!     piano_roll(&self.roll, Message::Wheel, Message::Resized)
//! }
//! ```

use iced::widget::Canvas;
use iced::{Element, Length};

use crate::canvas::PianoRollCanvas;
use crate::engine::PianoRoll;
use crate::interaction::WheelInput;

/// Create a piano roll element filling the available space
///
/// # Arguments
///
/// * `engine` - The piano roll, already brought up to date with `render()`
/// * `on_wheel` - Called with every wheel event over the canvas
/// * `on_resize` - Called with the canvas size (width, height) when layout changes it
pub fn piano_roll<'a, Message>(
    engine: &'a PianoRoll,
    on_wheel: impl Fn(WheelInput) -> Message + 'a,
    on_resize: impl Fn(f32, f32) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    Canvas::new(PianoRollCanvas {
        engine,
        on_wheel,
        on_resize,
    })
    .width(Length::Fill)
    .height(Length::Fill)
    .into()
}
