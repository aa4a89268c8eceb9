//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use tapestry::{
    EventBus, GameState, InputEvent, StateBase, StateContext, StateData, StateManager, Surface,
};

/// Lifecycle calls in the order they happened, as `"<id>.<method>"`.
pub type Journal = Rc<RefCell<Vec<String>>>;

/// A state that records every lifecycle call and can request a push on input.
pub struct Probe {
    base: StateBase,
    id: String,
    journal: Journal,
    push_on_input: Option<String>,
    hidden: bool,
}

impl Probe {
    pub fn new(id: &str, context: StateContext, journal: &Journal) -> Self {
        Self {
            base: StateBase::new(context),
            id: id.to_string(),
            journal: Rc::clone(journal),
            push_on_input: None,
            hidden: false,
        }
    }

    /// Pushes `target` through the bus whenever it receives input.
    pub fn pushing(mut self, target: &str) -> Self {
        self.push_on_input = Some(target.to_string());
        self
    }

    /// Hides itself every time it is entered.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn log(&self, method: &str) {
        self.journal.borrow_mut().push(format!("{}.{}", self.id, method));
    }
}

impl GameState for Probe {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, data: Option<StateData>) {
        self.base.enter(data);
        if self.hidden {
            self.base.set_visible(false);
        }
        self.log("enter");
    }

    fn exit(&mut self) {
        self.base.exit();
        self.log("exit");
    }

    fn pause(&mut self) {
        self.base.pause();
        self.log("pause");
    }

    fn resume(&mut self) {
        self.base.resume();
        self.log("resume");
    }

    fn handle_event(&mut self, _event: &InputEvent) -> bool {
        self.log("handle_event");
        if let Some(target) = &self.push_on_input {
            self.base.push_state(target, None);
        }
        true
    }

    fn update(&mut self, _dt: f32) {
        self.log("update");
    }

    fn render(&self, _surface: &mut dyn Surface) {
        self.log("render");
    }
}

/// A manager with one probe registered per id, all sharing one journal.
pub fn probes(ids: &[&str]) -> (EventBus, StateManager, Journal) {
    let bus = EventBus::new();
    let manager = StateManager::new(&bus);
    let journal = Journal::default();
    for id in ids {
        manager.register_state(*id, Probe::new(id, manager.context(), &journal));
    }
    (bus, manager, journal)
}

/// Takes the journal's entries, leaving it empty.
pub fn drain(journal: &Journal) -> Vec<String> {
    journal.borrow_mut().drain(..).collect()
}

pub fn is_active(manager: &StateManager, id: &str) -> bool {
    manager.with_state(id, |state| state.is_active()).unwrap_or(false)
}

pub fn is_visible(manager: &StateManager, id: &str) -> bool {
    manager.with_state(id, |state| state.is_visible()).unwrap_or(false)
}

pub fn state_data(manager: &StateManager, id: &str) -> StateData {
    manager
        .with_state(id, |state| state.base().state_data().clone())
        .unwrap_or_default()
}
