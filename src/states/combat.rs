//! Battle screen.
//!
//! Fights resolve in a single exchange: attacking wins, pausing flees. Either
//! way the state hands control back to the overworld.

use crate::events::{PayloadExt, ENEMY_KILLED};
use crate::input::InputEvent;
use crate::rendering::ui::{draw_centered_text, draw_panel, DIM_TEXT_COLOR, FAILED_COLOR, TEXT_COLOR};
use crate::rendering::Surface;
use crate::states::{GameState, StateBase, StateContext, StateData};
use log::info;
use macroquad::color::Color;
use serde_json::{json, Value};

const BACKGROUND: Color = Color::new(0.12, 0.04, 0.04, 1.0);
const DEFAULT_ENEMY: &str = "wolf";
const DEFAULT_RETURN: &str = "world_exploration";

pub struct CombatState {
    base: StateBase,
    enemy_type: String,
    location_id: Option<String>,
    return_state: String,
}

impl CombatState {
    pub fn new(context: StateContext) -> Self {
        Self {
            base: StateBase::new(context),
            enemy_type: DEFAULT_ENEMY.to_string(),
            location_id: None,
            return_state: DEFAULT_RETURN.to_string(),
        }
    }

    pub fn enemy_type(&self) -> &str {
        &self.enemy_type
    }

    fn finish(&self, result: &str) {
        let data = json!({
            "combat_result": result,
            "enemy_type": self.enemy_type,
        });
        self.base.change_state(&self.return_state, data.as_object().cloned());
    }

    fn win(&self) {
        info!("Defeated {}", self.enemy_type);
        let context = self.base.context();
        let mut payload = json!({"enemy_type": self.enemy_type});
        if let Some(location_id) = &self.location_id {
            payload["location_id"] = json!(location_id);
        }
        context.publish(ENEMY_KILLED, payload);
        context.notify("Victory!", &format!("You defeated the {}.", self.enemy_type), 2.0);
        self.finish("victory");
    }

    fn flee(&self) {
        info!("Fled from {}", self.enemy_type);
        self.base
            .context()
            .notify("Escaped", &format!("You fled from the {}.", self.enemy_type), 2.0);
        self.finish("fled");
    }
}

impl GameState for CombatState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, data: Option<StateData>) {
        self.base.enter(data);
        let state_data = Value::Object(self.base.state_data().clone());
        self.enemy_type = state_data.str_or("enemy_type", DEFAULT_ENEMY).to_string();
        self.location_id = state_data.str_field("location_id").map(str::to_string);
        self.return_state = state_data.str_or("return_state", DEFAULT_RETURN).to_string();
        info!("Combat started against {}", self.enemy_type);
    }

    fn handle_event(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Attack | InputEvent::Confirm => self.win(),
            InputEvent::Pause => self.flee(),
            _ => return false,
        }
        true
    }

    fn render(&self, surface: &mut dyn Surface) {
        let (width, height) = surface.size();
        surface.fill(BACKGROUND);
        draw_centered_text(
            surface,
            &format!("A wild {} appears!", self.enemy_type),
            height * 0.3,
            48.0,
            FAILED_COLOR,
        );
        draw_panel(surface, width * 0.25, height * 0.6, width * 0.5, 100.0);
        draw_centered_text(surface, "Space: Attack", height * 0.6 + 40.0, 28.0, TEXT_COLOR);
        draw_centered_text(surface, "Esc: Flee", height * 0.6 + 76.0, 22.0, DIM_TEXT_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, EventHandler, REQUEST_STATE_CHANGE};
    use crate::rendering::HeadlessSurface;
    use crate::states::PersistentData;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn combat(data: Value) -> (CombatState, Rc<RefCell<Vec<(&'static str, Value)>>>) {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for event_type in [ENEMY_KILLED, REQUEST_STATE_CHANGE] {
            let seen = Rc::clone(&seen);
            bus.subscribe(
                event_type,
                EventHandler::new(move |payload| {
                    seen.borrow_mut().push((event_type, payload.clone()));
                    Ok(())
                }),
            );
        }
        let mut state = CombatState::new(StateContext::new(bus, PersistentData::new()));
        state.enter(data.as_object().cloned());
        (state, seen)
    }

    #[test]
    fn test_attack_wins_and_returns() {
        let (mut state, seen) = combat(json!({"enemy_type": "goblin", "location_id": "wolf_den"}));
        assert!(state.handle_event(&InputEvent::Attack));

        let seen = seen.borrow();
        assert_eq!(
            seen[0],
            (ENEMY_KILLED, json!({"enemy_type": "goblin", "location_id": "wolf_den"}))
        );
        assert_eq!(seen[1].1["state_id"], json!("world_exploration"));
        assert_eq!(seen[1].1["data"]["combat_result"], json!("victory"));
    }

    #[test]
    fn test_flee_reports_no_kill() {
        let (mut state, seen) = combat(Value::Null);
        assert_eq!(state.enemy_type(), "wolf");
        state.handle_event(&InputEvent::Pause);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1["data"]["combat_result"], json!("fled"));
    }

    #[test]
    fn test_render_names_enemy() {
        let (state, _seen) = combat(json!({"enemy_type": "bandit"}));
        let mut surface = HeadlessSurface::new(800.0, 600.0);
        state.render(&mut surface);
        assert!(surface.contains_text("A wild bandit appears!"));
    }
}
