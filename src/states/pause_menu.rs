//! Pause overlay pushed over gameplay.

use crate::config::QUICK_SAVE_SLOT;
use crate::events::{GAME_SAVED, QUIT_GAME};
use crate::input::InputEvent;
use crate::rendering::ui::{draw_centered_text, draw_menu, draw_panel, with_alpha, HIGHLIGHT_COLOR};
use crate::rendering::Surface;
use crate::save::SaveSystem;
use crate::states::{GameState, StateBase, StateContext, StateData};
use crate::world::Direction;
use crate::TapestryResult;
use log::{error, info};
use macroquad::color::BLACK;
use serde_json::{json, Value};
use std::path::PathBuf;

const OPTIONS: [&str; 4] = ["Resume", "Save Game", "Main Menu", "Quit"];

pub struct PauseMenuState {
    base: StateBase,
    save_system: Option<SaveSystem>,
    selected: usize,
}

impl PauseMenuState {
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
            "Resume" => self.base.pop_state(),
            "Save Game" => self.save(),
            "Main Menu" => self.base.change_state("main_menu", None),
            _ => {
                info!("Exiting game from pause menu");
                self.base.publish(QUIT_GAME, Value::Null);
            }
        }
    }

    fn write_save(&self) -> TapestryResult<Option<PathBuf>> {
        let Some(saves) = &self.save_system else {
            return Ok(None);
        };
        let persistent = self.base.context().persistent();
        let character = persistent.get("player_character").unwrap_or_default();
        let metadata = json!({
            "player_name": character.get("name").cloned().unwrap_or(Value::Null),
            "player_level": character.get("level").cloned().unwrap_or(json!(1)),
        });
        saves
            .save_game(QUICK_SAVE_SLOT, &persistent.snapshot(), metadata.as_object().cloned())
            .map(Some)
    }

    fn save(&self) {
        let context = self.base.context();
        match self.write_save() {
            Ok(Some(path)) => {
                info!("Game saved to {}", path.display());
                context.publish(GAME_SAVED, json!({"slot": QUICK_SAVE_SLOT}));
                context.notify("Game Saved", &format!("Saved to slot {}", QUICK_SAVE_SLOT), 2.0);
            }
            Ok(None) => context.notify("Save Unavailable", "Saving is disabled", 2.0),
            Err(e) => {
                error!("Failed to save game: {}", e);
                context.notify("Save Failed", &e.to_string(), 3.0);
            }
        }
    }
}

impl GameState for PauseMenuState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, data: Option<StateData>) {
        self.base.enter(data);
        self.selected = 0;
        info!("Game paused");
    }

    fn handle_event(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Move(Direction::North) => {
                self.selected = (self.selected + OPTIONS.len() - 1) % OPTIONS.len();
            }
            InputEvent::Move(Direction::South) => {
                self.selected = (self.selected + 1) % OPTIONS.len();
            }
            InputEvent::Confirm | InputEvent::Interact => self.activate(),
            InputEvent::Pause => self.base.pop_state(),
            _ => return false,
        }
        true
    }

    fn render(&self, surface: &mut dyn Surface) {
        let (width, height) = surface.size();
        surface.draw_rect(0.0, 0.0, width, height, with_alpha(BLACK, 150));
        draw_panel(surface, width / 2.0 - 180.0, 120.0, 360.0, 360.0);
        draw_centered_text(surface, "Paused", 180.0, 48.0, HIGHLIGHT_COLOR);
        draw_menu(surface, &OPTIONS, self.selected, 230.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, EventHandler, POP_STATE, REQUEST_STATE_CHANGE};
    use crate::states::PersistentData;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    type Seen = Rc<RefCell<Vec<(&'static str, Value)>>>;

    fn pause_menu(save_system: Option<SaveSystem>) -> (PersistentData, PauseMenuState, Seen) {
        let bus = EventBus::new();
        let persistent = PersistentData::new();
        let seen: Seen = Rc::default();
        for event_type in [POP_STATE, REQUEST_STATE_CHANGE, GAME_SAVED, QUIT_GAME] {
            let seen = Rc::clone(&seen);
            bus.subscribe(
                event_type,
                EventHandler::new(move |payload| {
                    seen.borrow_mut().push((event_type, payload.clone()));
                    Ok(())
                }),
            );
        }
        let mut state = PauseMenuState::new(
            StateContext::new(bus, persistent.clone()),
            save_system,
        );
        state.enter(None);
        (persistent, state, seen)
    }

    fn choose(state: &mut PauseMenuState, option: &str) {
        while OPTIONS[state.selected()] != option {
            state.handle_event(&InputEvent::Move(Direction::South));
        }
        state.handle_event(&InputEvent::Confirm);
    }

    #[test]
    fn test_escape_and_resume_pop() {
        let (_persistent, mut state, seen) = pause_menu(None);
        state.handle_event(&InputEvent::Pause);
        choose(&mut state, "Resume");
        let kinds: Vec<&str> = seen.borrow().iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![POP_STATE, POP_STATE]);
    }

    #[test]
    fn test_save_writes_quick_slot() {
        let dir = TempDir::new().unwrap();
        let saves = SaveSystem::new(dir.path()).unwrap();
        let (persistent, mut state, seen) = pause_menu(Some(saves));
        persistent.set("player_character", json!({"name": "Ayla", "level": 2}));

        choose(&mut state, "Save Game");

        assert_eq!(seen.borrow()[0], (GAME_SAVED, json!({"slot": QUICK_SAVE_SLOT})));
        let reloaded = SaveSystem::new(dir.path()).unwrap();
        let game_state = reloaded.load_game(QUICK_SAVE_SLOT).unwrap().unwrap();
        assert_eq!(game_state["player_character"]["name"], json!("Ayla"));
        let info = reloaded.save_info(QUICK_SAVE_SLOT).unwrap();
        assert_eq!(info.metadata["player_level"], json!(2));
    }

    #[test]
    fn test_main_menu_and_quit() {
        let (_persistent, mut state, seen) = pause_menu(None);
        choose(&mut state, "Main Menu");
        choose(&mut state, "Quit");

        let seen = seen.borrow();
        assert_eq!(seen[0].1["state_id"], json!("main_menu"));
        assert_eq!(seen[1].0, QUIT_GAME);
    }
}
