//! Canvas Program for the piano roll
//!
//! The program never mutates the engine. Wheel events and size changes are
//! turned into messages through callback closures; the application applies
//! them to its `PianoRoll` and calls `render()` before the next draw.

use iced::widget::canvas::{self, Event, Frame, Geometry, Program};
use iced::widget::image::FilterMethod;
use iced::{keyboard, mouse, Point, Rectangle, Size, Theme};

use crate::composite::clip_rect;
use crate::engine::PianoRoll;
use crate::interaction::WheelInput;
use crate::theme::rgb;

/// Canvas state tracking modifiers and the last laid-out size
#[derive(Debug, Clone, Copy, Default)]
pub struct PianoRollInteraction {
    pub modifiers: keyboard::Modifiers,
    /// Size last reported through `on_resize`
    pub reported_size: Option<Size>,
}

/// Canvas program drawing a prepared `PianoRoll`
///
/// `on_wheel` receives every wheel event over the canvas, `on_resize` the new
/// canvas size whenever layout changes it.
pub struct PianoRollCanvas<'a, Message, W, R>
where
    W: Fn(WheelInput) -> Message,
    R: Fn(f32, f32) -> Message,
{
    pub engine: &'a PianoRoll,
    pub on_wheel: W,
    pub on_resize: R,
}

impl<'a, Message, W, R> Program<Message> for PianoRollCanvas<'a, Message, W, R>
where
    Message: Clone,
    W: Fn(WheelInput) -> Message,
    R: Fn(f32, f32) -> Message,
{
    type State = PianoRollInteraction;

    fn update(
        &self,
        interaction: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        match event {
            Event::Keyboard(keyboard::Event::ModifiersChanged(modifiers)) => {
                interaction.modifiers = *modifiers;
            }
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if let Some(position) = cursor.position_in(bounds) {
                    let input = WheelInput::from_scroll(
                        *delta,
                        interaction.modifiers.alt(),
                        interaction.modifiers.shift(),
                        position.x as f64,
                    );
                    return Some(canvas::Action::publish((self.on_wheel)(input)).and_capture());
                }
            }
            _ => {}
        }

        // Acts as the resize observer; silent once the engine is torn down
        let size = bounds.size();
        if self.engine.is_destroyed() || interaction.reported_size == Some(size) {
            return None;
        }
        interaction.reported_size = Some(size);
        if size.width > 0.0 && size.height > 0.0 {
            return Some(canvas::Action::publish((self.on_resize)(
                size.width.floor(),
                size.height.floor(),
            )));
        }
        None
    }

    fn mouse_interaction(
        &self,
        _interaction: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(
        &self,
        _interaction: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let engine = self.engine;

        frame.fill_rectangle(Point::ORIGIN, bounds.size(), rgb(engine.background_color(), 1.0));

        if engine.is_destroyed() {
            return vec![frame.into_geometry()];
        }

        // Back to front: background, composite, loop markers, playhead
        engine.background_list().replay(&mut frame);

        let viewport = engine.viewport();
        let clip = clip_rect(viewport);
        frame.with_clip(clip, |frame| {
            // Inside the clip, coordinates are relative to its top-left corner
            for (tile, blit) in engine.composite().visible_tiles(viewport) {
                let target = Rectangle {
                    x: blit.x - clip.x,
                    y: blit.y - clip.y,
                    ..blit
                };
                frame.draw_image(
                    target,
                    canvas::Image::new(tile.handle.clone()).filter_method(FilterMethod::Nearest),
                );
            }
        });

        engine.loop_list().replay(&mut frame);
        engine.playhead_list().replay(&mut frame);

        vec![frame.into_geometry()]
    }
}
