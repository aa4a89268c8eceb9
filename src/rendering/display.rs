//! # Display Management
//!
//! Screen rendering backed by macroquad.

use crate::rendering::Surface;
use macroquad::prelude::*;

/// Surface that draws to the macroquad window.
///
/// Requires a running macroquad context, so it is only constructed by the binary.
#[derive(Debug, Default)]
pub struct MacroquadSurface;

impl MacroquadSurface {
    /// Creates a surface for the current frame.
    pub fn new() -> Self {
        Self
    }
}

impl Surface for MacroquadSurface {
    fn size(&self) -> (f32, f32) {
        (screen_width(), screen_height())
    }

    fn fill(&mut self, color: Color) {
        // A full-screen rectangle keeps painter order, unlike clear_background
        draw_rectangle(0.0, 0.0, screen_width(), screen_height(), color);
    }

    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        draw_rectangle(x, y, width, height, color);
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
        draw_rectangle_lines(x, y, width, height, thickness, color);
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color) {
        draw_text(text, x, y, font_size, color);
    }

    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        measure_text(text, None, font_size as u16, 1.0).width
    }
}
