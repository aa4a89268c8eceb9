//! # Game States
//!
//! The state abstraction and the stack that drives it.
//!
//! A game state is one mode of play (a menu, the overworld, a battle, a
//! pause screen). States live in the [`StateManager`]'s registry under a string
//! id and are arranged in a stack: the top state receives input and updates,
//! and every visible state is drawn bottom to top.
//!
//! States never touch the stack directly. They publish transition requests
//! through their [`StateContext`], which keeps them decoupled from the manager.

pub mod combat;
pub mod context;
pub mod main_menu;
pub mod manager;
pub mod pause_menu;
pub mod persistent;
pub mod world_exploration;

pub use combat::CombatState;
pub use context::StateContext;
pub use main_menu::MainMenuState;
pub use manager::{StateManager, StateTransition};
pub use pause_menu::PauseMenuState;
pub use persistent::PersistentData;
pub use world_exploration::WorldExplorationState;

use crate::input::InputEvent;
use crate::rendering::Surface;
use serde_json::{Map, Value};

/// Free-form data handed to a state on entry and kept for its lifetime.
pub type StateData = Map<String, Value>;

/// Lifecycle flags and accumulated data shared by every state.
///
/// Concrete states embed one of these and expose it through
/// [`GameState::base`]; the trait's default lifecycle methods operate on it.
#[derive(Debug, Clone)]
pub struct StateBase {
    active: bool,
    visible: bool,
    state_data: StateData,
    context: StateContext,
}

impl StateBase {
    /// Creates a state that is neither active nor visible until entered.
    pub fn new(context: StateContext) -> Self {
        Self {
            active: false,
            visible: false,
            state_data: StateData::new(),
            context,
        }
    }

    /// Marks the state active and visible and merges `data` into its state data.
    ///
    /// The merge is shallow: keys in `data` overwrite existing keys and
    /// unrelated keys from earlier entries survive.
    pub fn enter(&mut self, data: Option<StateData>) {
        self.active = true;
        self.visible = true;
        if let Some(data) = data {
            self.state_data.extend(data);
        }
    }

    pub fn exit(&mut self) {
        self.active = false;
        self.visible = false;
    }

    pub fn pause(&mut self) {
        self.active = false;
    }

    pub fn resume(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hides or reveals the state without touching its active flag.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn state_data(&self) -> &StateData {
        &self.state_data
    }

    pub fn state_data_mut(&mut self) -> &mut StateData {
        &mut self.state_data
    }

    /// Looks up a single entry of the state data.
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.state_data.get(key)
    }

    pub fn context(&self) -> &StateContext {
        &self.context
    }

    /// Requests a full stack replacement with `state_id`.
    pub fn change_state(&self, state_id: &str, data: Option<StateData>) {
        self.context.request_change(state_id, data);
    }

    /// Requests that `state_id` be pushed above the current top.
    pub fn push_state(&self, state_id: &str, data: Option<StateData>) {
        self.context.request_push(state_id, data);
    }

    /// Requests that the top state be popped.
    pub fn pop_state(&self) {
        self.context.request_pop();
    }

    pub fn publish(&self, event_type: &str, payload: Value) {
        self.context.publish(event_type, payload);
    }
}

/// One mode of play managed by the [`StateManager`].
///
/// Implementors provide [`base`](GameState::base) and
/// [`base_mut`](GameState::base_mut); every other method has a default.
/// Overrides of the lifecycle methods should call through to the base so the
/// active and visible flags stay correct.
pub trait GameState {
    fn base(&self) -> &StateBase;

    fn base_mut(&mut self) -> &mut StateBase;

    /// Human-readable name, used in logs.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Called when the state becomes part of the stack.
    fn enter(&mut self, data: Option<StateData>) {
        self.base_mut().enter(data);
    }

    /// Called when the state leaves the stack.
    fn exit(&mut self) {
        self.base_mut().exit();
    }

    /// Called when another state is pushed above this one.
    fn pause(&mut self) {
        self.base_mut().pause();
    }

    /// Called when this state becomes the top again.
    fn resume(&mut self) {
        self.base_mut().resume();
    }

    /// Handles one input event. Returns true if the event was consumed.
    fn handle_event(&mut self, _event: &InputEvent) -> bool {
        false
    }

    /// Advances the state by `dt` seconds.
    fn update(&mut self, _dt: f32) {}

    fn render(&self, _surface: &mut dyn Surface) {}

    fn is_active(&self) -> bool {
        self.base().is_active()
    }

    fn is_visible(&self) -> bool {
        self.base().is_visible()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use serde_json::json;

    struct Blank {
        base: StateBase,
    }

    impl GameState for Blank {
        fn base(&self) -> &StateBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut StateBase {
            &mut self.base
        }
    }

    fn blank() -> Blank {
        Blank {
            base: StateBase::new(StateContext::new(EventBus::new(), PersistentData::new())),
        }
    }

    #[test]
    fn test_flags_follow_lifecycle() {
        let mut state = blank();
        assert!(!state.is_active());
        assert!(!state.is_visible());

        state.enter(None);
        assert!(state.is_active() && state.is_visible());

        state.pause();
        assert!(!state.is_active() && state.is_visible());

        state.resume();
        assert!(state.is_active());

        state.exit();
        assert!(!state.is_active() && !state.is_visible());
    }

    #[test]
    fn test_enter_merges_shallowly() {
        let mut state = blank();
        state.enter(json!({"a": 1, "b": {"x": 1}}).as_object().cloned());
        state.exit();
        state.enter(json!({"b": {"y": 2}}).as_object().cloned());

        assert_eq!(state.base().data("a"), Some(&json!(1)));
        assert_eq!(state.base().data("b"), Some(&json!({"y": 2})));
    }

    #[test]
    fn test_default_handle_event_ignores_input() {
        let mut state = blank();
        assert!(!state.handle_event(&InputEvent::Confirm));
        assert_eq!(state.name(), "Blank");
    }
}
