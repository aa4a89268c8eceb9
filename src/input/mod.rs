//! # Input Module
//!
//! Keyboard handling for the game host.
//!
//! Raw keys are translated into semantic [`InputEvent`]s through the control
//! bindings in [`Settings`](crate::Settings), so states never see key codes and
//! tests can drive them without a window.

use crate::world::Direction;
use log::warn;
use macroquad::prelude::{is_key_pressed, KeyCode};
use std::collections::BTreeMap;

/// A player intent, independent of which key produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Move on the overworld or through a menu.
    Move(Direction),
    /// Activate the selected menu entry.
    Confirm,
    /// Talk, enter or inspect whatever is underfoot.
    Interact,
    Attack,
    /// Open the pause menu, or back out of the current overlay.
    Pause,
    Help,
}

impl InputEvent {
    /// The event a named control action produces.
    pub fn from_action(action: &str) -> Option<InputEvent> {
        match action {
            "move_up" => Some(InputEvent::Move(Direction::North)),
            "move_down" => Some(InputEvent::Move(Direction::South)),
            "move_left" => Some(InputEvent::Move(Direction::West)),
            "move_right" => Some(InputEvent::Move(Direction::East)),
            "confirm" => Some(InputEvent::Confirm),
            "interact" => Some(InputEvent::Interact),
            "attack" => Some(InputEvent::Attack),
            "pause" => Some(InputEvent::Pause),
            "help" => Some(InputEvent::Help),
            _ => None,
        }
    }
}

/// Translates pressed keys into [`InputEvent`]s.
#[derive(Debug, Clone)]
pub struct InputHandler {
    bindings: Vec<(KeyCode, InputEvent)>,
    /// Whether WASD also moves, in addition to the configured keys
    pub wasd_enabled: bool,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::from_controls(&crate::settings::default_controls())
    }
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds bindings from an action-name to key-name map.
    ///
    /// Unknown actions and unparseable key names are logged and skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use macroquad::prelude::KeyCode;
    /// use tapestry::{InputEvent, InputHandler};
    ///
    /// let mut controls = BTreeMap::new();
    /// controls.insert("confirm".to_string(), "SPACE".to_string());
    /// let handler = InputHandler::from_controls(&controls);
    /// assert_eq!(handler.event_for_key(KeyCode::Space), Some(InputEvent::Confirm));
    /// ```
    pub fn from_controls(controls: &BTreeMap<String, String>) -> Self {
        let mut bindings = Vec::with_capacity(controls.len());
        for (action, key_name) in controls {
            let Some(event) = InputEvent::from_action(action) else {
                warn!("Ignoring binding for unknown control action '{}'", action);
                continue;
            };
            match parse_key_name(key_name) {
                Some(key) => bindings.push((key, event)),
                None => warn!("Unknown key '{}' bound to '{}'", key_name, action),
            }
        }
        Self {
            bindings,
            wasd_enabled: true,
        }
    }

    pub fn bindings(&self) -> &[(KeyCode, InputEvent)] {
        &self.bindings
    }

    /// The event bound to `key`, if any.
    pub fn event_for_key(&self, key: KeyCode) -> Option<InputEvent> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, event)| *event)
            .or_else(|| {
                if self.wasd_enabled {
                    wasd_direction(key).map(InputEvent::Move)
                } else {
                    None
                }
            })
    }

    /// Collects the events for every key pressed this frame.
    ///
    /// Requires a running macroquad context.
    pub fn poll(&self) -> Vec<InputEvent> {
        let mut events: Vec<InputEvent> = self
            .bindings
            .iter()
            .filter(|(key, _)| is_key_pressed(*key))
            .map(|(_, event)| *event)
            .collect();

        if self.wasd_enabled {
            for key in [KeyCode::W, KeyCode::A, KeyCode::S, KeyCode::D] {
                if is_key_pressed(key) && !self.bindings.iter().any(|(bound, _)| *bound == key) {
                    events.extend(wasd_direction(key).map(InputEvent::Move));
                }
            }
        }
        events
    }
}

fn wasd_direction(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::W => Some(Direction::North),
        KeyCode::S => Some(Direction::South),
        KeyCode::A => Some(Direction::West),
        KeyCode::D => Some(Direction::East),
        _ => None,
    }
}

/// Parses a key name as written in the settings file.
///
/// Names are case-insensitive: `"UP"`, `"escape"`, `"Return"`, `"e"`, `"F1"`.
pub fn parse_key_name(name: &str) -> Option<KeyCode> {
    let key = match name.trim().to_ascii_uppercase().as_str() {
        "UP" => KeyCode::Up,
        "DOWN" => KeyCode::Down,
        "LEFT" => KeyCode::Left,
        "RIGHT" => KeyCode::Right,
        "ESCAPE" | "ESC" => KeyCode::Escape,
        "SPACE" => KeyCode::Space,
        "RETURN" | "ENTER" => KeyCode::Enter,
        "TAB" => KeyCode::Tab,
        "BACKSPACE" => KeyCode::Backspace,
        "F1" => KeyCode::F1,
        "F2" => KeyCode::F2,
        "F3" => KeyCode::F3,
        "F4" => KeyCode::F4,
        "0" => KeyCode::Key0,
        "1" => KeyCode::Key1,
        "2" => KeyCode::Key2,
        "3" => KeyCode::Key3,
        "4" => KeyCode::Key4,
        "5" => KeyCode::Key5,
        "6" => KeyCode::Key6,
        "7" => KeyCode::Key7,
        "8" => KeyCode::Key8,
        "9" => KeyCode::Key9,
        "A" => KeyCode::A,
        "B" => KeyCode::B,
        "C" => KeyCode::C,
        "D" => KeyCode::D,
        "E" => KeyCode::E,
        "F" => KeyCode::F,
        "G" => KeyCode::G,
        "H" => KeyCode::H,
        "I" => KeyCode::I,
        "J" => KeyCode::J,
        "K" => KeyCode::K,
        "L" => KeyCode::L,
        "M" => KeyCode::M,
        "N" => KeyCode::N,
        "O" => KeyCode::O,
        "P" => KeyCode::P,
        "Q" => KeyCode::Q,
        "R" => KeyCode::R,
        "S" => KeyCode::S,
        "T" => KeyCode::T,
        "U" => KeyCode::U,
        "V" => KeyCode::V,
        "W" => KeyCode::W,
        "X" => KeyCode::X,
        "Y" => KeyCode::Y,
        "Z" => KeyCode::Z,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!(parse_key_name("UP"), Some(KeyCode::Up));
        assert_eq!(parse_key_name("escape"), Some(KeyCode::Escape));
        assert_eq!(parse_key_name(" Return "), Some(KeyCode::Enter));
        assert_eq!(parse_key_name("e"), Some(KeyCode::E));
        assert_eq!(parse_key_name("NOT_A_KEY"), None);
    }

    #[test]
    fn test_default_bindings() {
        let handler = InputHandler::default();
        assert_eq!(
            handler.event_for_key(KeyCode::Up),
            Some(InputEvent::Move(Direction::North))
        );
        assert_eq!(handler.event_for_key(KeyCode::Escape), Some(InputEvent::Pause));
        assert_eq!(handler.event_for_key(KeyCode::E), Some(InputEvent::Interact));
        assert_eq!(handler.event_for_key(KeyCode::Enter), Some(InputEvent::Confirm));
        assert_eq!(
            handler.event_for_key(KeyCode::A),
            Some(InputEvent::Move(Direction::West))
        );
    }

    #[test]
    fn test_configured_binding_wins_over_wasd() {
        let mut controls = BTreeMap::new();
        controls.insert("attack".to_string(), "W".to_string());
        controls.insert("teleport".to_string(), "T".to_string());
        controls.insert("pause".to_string(), "NOPE".to_string());
        let mut handler = InputHandler::from_controls(&controls);

        assert_eq!(handler.bindings().len(), 1);
        assert_eq!(handler.event_for_key(KeyCode::W), Some(InputEvent::Attack));

        handler.wasd_enabled = false;
        assert_eq!(handler.event_for_key(KeyCode::S), None);
    }
}
