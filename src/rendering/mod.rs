//! # Rendering Module
//!
//! Drawing targets for game states and overlays.
//!
//! States never call macroquad directly. They draw through the [`Surface`] trait so
//! the state machine stays presentation-agnostic: the binary hands them a
//! [`MacroquadSurface`], tests and the headless smoke run hand them a
//! [`HeadlessSurface`] that records every draw call.

pub mod display;
pub mod headless;
pub mod ui;

pub use display::*;
pub use headless::*;
pub use ui::*;

use macroquad::color::Color;

/// An opaque drawable target.
///
/// Coordinates are pixels from the top-left corner. Text `y` is the baseline.
pub trait Surface {
    /// Returns the drawable size as `(width, height)`.
    fn size(&self) -> (f32, f32);

    /// Covers the whole surface with `color`.
    fn fill(&mut self, color: Color);

    /// Draws a filled rectangle.
    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);

    /// Draws a rectangle outline.
    fn draw_rect_outline(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness: f32,
        color: Color,
    );

    /// Draws a line of text.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color);

    /// Returns the rendered width of `text` in pixels.
    ///
    /// The default is a monospace estimate; backends with real fonts override it.
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.5
    }
}
