//! # Headless Rendering
//!
//! A [`Surface`] that records draw calls instead of drawing them.

use crate::rendering::Surface;
use macroquad::color::Color;

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill(Color),
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    RectOutline {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness: f32,
        color: Color,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    },
}

/// Surface that keeps an ordered log of everything drawn on it.
///
/// # Examples
///
/// ```
/// use tapestry::{HeadlessSurface, Surface};
/// use macroquad::color::WHITE;
///
/// let mut surface = HeadlessSurface::new(800.0, 600.0);
/// surface.draw_text("Hello", 10.0, 20.0, 24.0, WHITE);
/// assert!(surface.contains_text("Hello"));
/// assert_eq!(surface.texts(), vec!["Hello"]);
/// ```
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl HeadlessSurface {
    /// Creates an empty surface of the given size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Every draw call so far, oldest first.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// The text of every text draw call, oldest first.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns true if any text draw call contains `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|text| text.contains(needle))
    }

    /// Index of the first text draw call containing `needle`.
    pub fn text_position(&self, needle: &str) -> Option<usize> {
        self.commands.iter().position(|command| {
            matches!(command, DrawCommand::Text { text, .. } if text.contains(needle))
        })
    }

    /// Forgets all recorded calls, typically between frames.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_SCREEN_WIDTH,
            crate::config::DEFAULT_SCREEN_HEIGHT,
        )
    }
}

impl Surface for HeadlessSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn fill(&mut self, color: Color) {
        self.commands.push(DrawCommand::Fill(color));
    }

    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn draw_rect_outline(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness: f32,
        color: Color,
    ) {
        self.commands.push(DrawCommand::RectOutline {
            x,
            y,
            width,
            height,
            thickness,
            color,
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            font_size,
            color,
        });
    }
}
