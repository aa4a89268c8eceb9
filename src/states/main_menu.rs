//! Title screen: new game, continue, quit.

use crate::events::{GAME_LOADED, NEW_GAME_STARTED, QUIT_GAME};
use crate::input::InputEvent;
use crate::rendering::ui::{draw_centered_text, draw_menu, DIM_TEXT_COLOR, HIGHLIGHT_COLOR};
use crate::rendering::Surface;
use crate::save::SaveSystem;
use crate::states::{GameState, StateBase, StateContext, StateData};
use crate::world::Direction;
use log::{error, info};
use macroquad::color::Color;
use serde_json::{json, Value};

const OPTIONS: [&str; 3] = ["New Game", "Continue", "Quit"];
const BACKGROUND: Color = Color::new(0.08, 0.08, 0.14, 1.0);

/// Persistent keys that belong to one playthrough.
pub const RUN_KEYS: [&str; 3] = ["world", "player_character", "player_world_position"];

pub struct MainMenuState {
    base: StateBase,
    save_system: Option<SaveSystem>,
    selected: usize,
}

impl MainMenuState {
    pub fn new(context: StateContext, save_system: Option<SaveSystem>) -> Self {
        Self {
            base: StateBase::new(context),
            save_system,
            selected: 0,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn activate(&mut self) {
        match OPTIONS[self.selected] {
            "New Game" => self.start_new_game(),
            "Continue" => self.continue_game(),
            _ => {
                info!("Exiting game");
                self.base.publish(QUIT_GAME, Value::Null);
            }
        }
    }

    fn start_new_game(&self) {
        info!("Starting new game");
        let persistent = self.base.context().persistent();
        persistent.set(
            "player_character_template",
            json!({"name": "Adventurer", "race": "Human", "class": "Warrior"}),
        );
        for key in RUN_KEYS {
            persistent.set(key, Value::Null);
        }

        self.base.publish(NEW_GAME_STARTED, Value::Null);
        self.base.change_state("world_exploration", None);
    }

    fn continue_game(&self) {
        let context = self.base.context();
        let Some(slot) = self.save_system.as_ref().and_then(SaveSystem::latest_slot) else {
            context.notify("Continue", "No saved game found", 2.0);
            return;
        };

        let loaded = self
            .save_system
            .as_ref()
            .map(|saves| saves.load_game(slot))
            .transpose();
        match loaded {
            Ok(Some(Some(game_state))) => {
                info!("Loading game from slot {}", slot);
                let persistent = context.persistent();
                persistent.clear();
                persistent.extend(game_state);
                self.base.publish(GAME_LOADED, json!({"slot": slot}));
                self.base.change_state("world_exploration", None);
            }
            Ok(_) => context.notify("Continue", "No saved game found", 2.0),
            Err(e) => {
                error!("Failed to load game from slot {}: {}", slot, e);
                context.notify("Load Failed", &e.to_string(), 3.0);
            }
        }
    }
}

impl GameState for MainMenuState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, data: Option<StateData>) {
        self.base.enter(data);
        self.selected = 0;
        info!("Entered main menu state");
    }

    fn handle_event(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Move(Direction::North) => {
                self.selected = (self.selected + OPTIONS.len() - 1) % OPTIONS.len();
                true
            }
            InputEvent::Move(Direction::South) => {
                self.selected = (self.selected + 1) % OPTIONS.len();
                true
            }
            InputEvent::Confirm | InputEvent::Interact => {
                self.activate();
                true
            }
            _ => false,
        }
    }

    fn render(&self, surface: &mut dyn Surface) {
        surface.fill(BACKGROUND);
        draw_centered_text(surface, "Tapestry", 140.0, 72.0, HIGHLIGHT_COLOR);
        draw_menu(surface, &OPTIONS, self.selected, 240.0);
        let (_, height) = surface.size();
        draw_centered_text(
            surface,
            "Arrows to choose, Enter to confirm",
            height - 40.0,
            20.0,
            DIM_TEXT_COLOR,
        );
    }
}
