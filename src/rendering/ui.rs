//! # User Interface Elements
//!
//! Small drawing helpers shared by states and overlays: panels, menus and
//! progress bars.

use crate::rendering::Surface;
use macroquad::color::Color;

pub const TEXT_COLOR: Color = Color::new(1.0, 1.0, 1.0, 1.0);
pub const DIM_TEXT_COLOR: Color = Color::new(0.78, 0.78, 0.78, 1.0);
pub const HIGHLIGHT_COLOR: Color = Color::new(0.31, 0.47, 0.78, 1.0);
pub const PANEL_COLOR: Color = Color::new(0.12, 0.12, 0.12, 0.9);
pub const BORDER_COLOR: Color = Color::new(0.59, 0.59, 0.78, 1.0);
pub const COMPLETE_COLOR: Color = Color::new(0.0, 1.0, 0.0, 1.0);
pub const FAILED_COLOR: Color = Color::new(1.0, 0.2, 0.2, 1.0);

/// Returns `color` with its alpha replaced by `alpha` (0-255).
pub fn with_alpha(color: Color, alpha: u8) -> Color {
    Color::new(color.r, color.g, color.b, alpha as f32 / 255.0)
}

/// Draws a bordered panel.
pub fn draw_panel(surface: &mut dyn Surface, x: f32, y: f32, width: f32, height: f32) {
    surface.draw_rect(x, y, width, height, PANEL_COLOR);
    surface.draw_rect_outline(x, y, width, height, 2.0, BORDER_COLOR);
}

/// Draws `text` horizontally centred at baseline `y`.
pub fn draw_centered_text(
    surface: &mut dyn Surface,
    text: &str,
    y: f32,
    font_size: f32,
    color: Color,
) {
    let (width, _) = surface.size();
    let text_width = surface.text_width(text, font_size);
    surface.draw_text(text, (width - text_width) / 2.0, y, font_size, color);
}

/// Draws a vertical list of options with the selected one highlighted.
pub fn draw_menu(surface: &mut dyn Surface, options: &[&str], selected: usize, top: f32) {
    let (width, _) = surface.size();
    let row_width = 260.0;
    let row_height = 40.0;
    let x = (width - row_width) / 2.0;

    for (index, option) in options.iter().enumerate() {
        let y = top + index as f32 * (row_height + 12.0);
        if index == selected {
            surface.draw_rect(x, y, row_width, row_height, HIGHLIGHT_COLOR);
        }
        surface.draw_rect_outline(x, y, row_width, row_height, 2.0, BORDER_COLOR);
        draw_centered_text(surface, option, y + 27.0, 24.0, TEXT_COLOR);
    }
}

/// Draws a horizontal bar filled to `fraction` (clamped to 0..=1).
pub fn draw_progress_bar(
    surface: &mut dyn Surface,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    fraction: f32,
    color: Color,
) {
    let fraction = fraction.clamp(0.0, 1.0);
    surface.draw_rect(x, y, width, height, Color::new(0.2, 0.2, 0.2, 1.0));
    surface.draw_rect(x, y, width * fraction, height, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::{DrawCommand, HeadlessSurface};

    #[test]
    fn test_with_alpha() {
        let faded = with_alpha(TEXT_COLOR, 0);
        assert_eq!(faded.a, 0.0);
        assert_eq!(with_alpha(TEXT_COLOR, 255).a, 1.0);
    }

    #[test]
    fn test_menu_highlights_selection() {
        let mut surface = HeadlessSurface::new(800.0, 600.0);
        draw_menu(&mut surface, &["Resume", "Quit"], 1, 100.0);

        let highlighted: Vec<f32> = surface
            .commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Rect { y, color, .. } if *color == HIGHLIGHT_COLOR => Some(*y),
                _ => None,
            })
            .collect();
        assert_eq!(highlighted, vec![152.0]);
        assert_eq!(surface.texts(), vec!["Resume", "Quit"]);
    }

    #[test]
    fn test_progress_bar_clamps() {
        let mut surface = HeadlessSurface::new(800.0, 600.0);
        draw_progress_bar(&mut surface, 0.0, 0.0, 100.0, 10.0, 1.7, COMPLETE_COLOR);
        match &surface.commands()[1] {
            DrawCommand::Rect { width, .. } => assert_eq!(*width, 100.0),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
