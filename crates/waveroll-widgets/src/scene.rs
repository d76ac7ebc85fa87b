//! Display lists for the vector layers
//!
//! Layers record plain primitives when they are dirty; the canvas replays the
//! recorded list onto an iced `Frame` on every draw. Keeping the list as data
//! lets layers be tested without a renderer.

use iced::widget::canvas::{Frame, Path, Stroke, Text};
use iced::{Point, Size};

use crate::theme::rgb;

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: u32,
        alpha: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: u32,
        alpha: f32,
    },
    Text {
        content: String,
        x: f32,
        y: f32,
        size: f32,
        color: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    primitives: Vec<Primitive>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: u32, alpha: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.primitives.push(Primitive::FillRect {
            x,
            y,
            width,
            height,
            color,
            alpha,
        });
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: u32, alpha: f32) {
        self.primitives.push(Primitive::Line {
            from,
            to,
            width,
            color,
            alpha,
        });
    }

    pub fn text(&mut self, content: impl Into<String>, x: f32, y: f32, size: f32, color: u32) {
        self.primitives.push(Primitive::Text {
            content: content.into(),
            x,
            y,
            size,
            color,
        });
    }

    /// Draw every primitive onto an iced frame
    pub fn replay(&self, frame: &mut Frame) {
        for primitive in &self.primitives {
            match primitive {
                Primitive::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                    alpha,
                } => {
                    frame.fill_rectangle(Point::new(*x, *y), Size::new(*width, *height), rgb(*color, *alpha));
                }
                Primitive::Line {
                    from,
                    to,
                    width,
                    color,
                    alpha,
                } => {
                    frame.stroke(
                        &Path::line(Point::new(from.0, from.1), Point::new(to.0, to.1)),
                        Stroke::default()
                            .with_color(rgb(*color, *alpha))
                            .with_width(*width),
                    );
                }
                Primitive::Text {
                    content,
                    x,
                    y,
                    size,
                    color,
                } => {
                    frame.fill_text(Text {
                        content: content.clone(),
                        position: Point::new(*x, *y),
                        size: (*size).into(),
                        color: rgb(*color, 1.0),
                        ..Text::default()
                    });
                }
            }
        }
    }
}
