//! # State Manager
//!
//! Owns the state registry and the state stack.
//!
//! Every transition request, whether it comes from a direct call or from one
//! of the three transition events, is queued and then applied as soon as no
//! state callback is running. A state that requests a transition from inside
//! its own `handle_event` or `update` therefore never observes a half-mutated
//! stack: its request lands after the callback returns, in request order.

use crate::events::{
    EventBus, EventHandler, PayloadExt, POP_STATE, PUSH_STATE, REQUEST_STATE_CHANGE,
};
use crate::input::InputEvent;
use crate::rendering::Surface;
use crate::states::{GameState, PersistentData, StateContext, StateData};
use crate::{TapestryError, TapestryResult};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

type Registry = HashMap<String, Box<dyn GameState>>;

/// A queued stack operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StateTransition {
    /// Exit every state on the stack, then enter `state_id`.
    Change {
        state_id: String,
        data: Option<StateData>,
    },
    /// Pause the top state, then enter `state_id` above it.
    Push {
        state_id: String,
        data: Option<StateData>,
    },
    /// Exit the top state and resume the one beneath it.
    Pop,
}

impl StateTransition {
    /// Parses the payload of one of the three transition events.
    pub fn from_event(event_type: &str, payload: &Value) -> TapestryResult<Self> {
        if event_type == POP_STATE {
            return Ok(StateTransition::Pop);
        }

        let state_id = payload
            .str_field("state_id")
            .ok_or_else(|| TapestryError::InvalidPayload {
                event: event_type.to_string(),
                reason: "missing string field 'state_id'".to_string(),
            })?
            .to_string();
        let data = payload.object("data");

        match event_type {
            REQUEST_STATE_CHANGE => Ok(StateTransition::Change { state_id, data }),
            PUSH_STATE => Ok(StateTransition::Push { state_id, data }),
            other => Err(TapestryError::InvalidPayload {
                event: other.to_string(),
                reason: "not a state transition event".to_string(),
            }),
        }
    }
}

struct ManagerCore {
    registry: RefCell<Registry>,
    stack: RefCell<Vec<String>>,
    pending: RefCell<VecDeque<StateTransition>>,
    persistent: PersistentData,
    event_bus: EventBus,
}

impl ManagerCore {
    fn request(&self, transition: StateTransition) {
        self.pending.borrow_mut().push_back(transition);
        self.drain();
    }

    /// Applies queued transitions until the queue is empty.
    ///
    /// Returns without doing anything while a state callback holds the
    /// registry; the holder drains once it is done.
    fn drain(&self) {
        let Ok(mut registry) = self.registry.try_borrow_mut() else {
            debug!("State callback in progress; transition deferred");
            return;
        };

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(transition) = next else {
                break;
            };
            if let Err(e) = self.apply(&mut registry, transition) {
                report(&e);
            }
        }
    }

    fn apply(&self, registry: &mut Registry, transition: StateTransition) -> TapestryResult<()> {
        match transition {
            StateTransition::Change { state_id, data } => {
                self.apply_change(registry, state_id, data)
            }
            StateTransition::Push { state_id, data } => self.apply_push(registry, state_id, data),
            StateTransition::Pop => self.apply_pop(registry),
        }
    }

    fn apply_change(
        &self,
        registry: &mut Registry,
        state_id: String,
        data: Option<StateData>,
    ) -> TapestryResult<()> {
        if !registry.contains_key(&state_id) {
            return Err(TapestryError::UnknownState(state_id));
        }

        info!("Changing state to: {}", state_id);
        loop {
            let leaving = self.stack.borrow_mut().pop();
            let Some(leaving) = leaving else {
                break;
            };
            if let Some(state) = registry.get_mut(&leaving) {
                state.exit();
                debug!("Exited state: {}", leaving);
            }
        }

        self.enter(registry, state_id, data)
    }

    fn apply_push(
        &self,
        registry: &mut Registry,
        state_id: String,
        data: Option<StateData>,
    ) -> TapestryResult<()> {
        if !registry.contains_key(&state_id) {
            return Err(TapestryError::UnknownState(state_id));
        }

        info!("Pushing state: {}", state_id);
        let top = self.stack.borrow().last().cloned();
        if let Some(id) = top {
            if let Some(state) = registry.get_mut(&id) {
                state.pause();
            }
        }

        self.enter(registry, state_id, data)
    }

    fn apply_pop(&self, registry: &mut Registry) -> TapestryResult<()> {
        let leaving = self.stack.borrow_mut().pop();
        let Some(leaving) = leaving else {
            return Err(TapestryError::EmptyStack);
        };

        info!("Popping state: {}", leaving);
        if let Some(state) = registry.get_mut(&leaving) {
            state.exit();
        }

        let top = self.stack.borrow().last().cloned();
        if let Some(id) = top {
            if let Some(state) = registry.get_mut(&id) {
                state.resume();
            }
        }
        Ok(())
    }

    fn enter(
        &self,
        registry: &mut Registry,
        state_id: String,
        data: Option<StateData>,
    ) -> TapestryResult<()> {
        let payload = self.persistent.overlay(data);
        let state = registry
            .get_mut(&state_id)
            .ok_or_else(|| TapestryError::UnknownState(state_id.clone()))?;
        state.enter(Some(payload));
        debug!("Entered state: {}", state_id);
        self.stack.borrow_mut().push(state_id);
        Ok(())
    }
}

fn report(error: &TapestryError) {
    match error {
        TapestryError::UnknownState(id) => {
            error!("Attempted transition to unknown state: {}", id)
        }
        TapestryError::EmptyStack => warn!("Attempted to pop state with empty stack"),
        other => error!("State transition failed: {}", other),
    }
}

/// Registry of named game states plus the stack that orders them.
///
/// The manager subscribes to `request_state_change`, `push_state` and
/// `pop_state` on construction and unsubscribes when dropped.
pub struct StateManager {
    core: Rc<ManagerCore>,
    subscriptions: Vec<(&'static str, EventHandler)>,
}

impl StateManager {
    /// Creates an empty manager listening for transition events on `event_bus`.
    pub fn new(event_bus: &EventBus) -> Self {
        let core = Rc::new(ManagerCore {
            registry: RefCell::new(HashMap::new()),
            stack: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            persistent: PersistentData::new(),
            event_bus: event_bus.clone(),
        });

        let subscriptions = [REQUEST_STATE_CHANGE, PUSH_STATE, POP_STATE]
            .into_iter()
            .map(|event_type| {
                let handler = transition_handler(event_type, Rc::downgrade(&core));
                event_bus.subscribe(event_type, handler.clone());
                (event_type, handler)
            })
            .collect();

        info!("StateManager initialized");
        Self {
            core,
            subscriptions,
        }
    }

    /// Adds `state` to the registry under `state_id`.
    ///
    /// Registering an id twice replaces the earlier instance; a replaced
    /// instance that is still on the stack is not exited.
    pub fn register_state<S>(&self, state_id: impl Into<String>, state: S)
    where
        S: GameState + 'static,
    {
        let state_id = state_id.into();
        let Ok(mut registry) = self.core.registry.try_borrow_mut() else {
            error!(
                "Cannot register state '{}' while a state callback is running",
                state_id
            );
            return;
        };
        if registry.insert(state_id.clone(), Box::new(state)).is_some() {
            debug!("Replaced previously registered state: {}", state_id);
        }
        info!("Registered state: {}", state_id);
    }

    /// Exits every state on the stack and enters `state_id`.
    ///
    /// The new state receives the persistent data overlaid with `data`. An
    /// unknown id is logged and leaves the stack untouched.
    pub fn change_state(&self, state_id: &str, data: Option<StateData>) {
        self.core.request(StateTransition::Change {
            state_id: state_id.to_string(),
            data,
        });
    }

    /// Pauses the top state and enters `state_id` above it.
    pub fn push_state(&self, state_id: &str, data: Option<StateData>) {
        self.core.request(StateTransition::Push {
            state_id: state_id.to_string(),
            data,
        });
    }

    /// Exits the top state and resumes the one beneath it.
    ///
    /// Popping an empty stack is logged and otherwise ignored.
    pub fn pop_state(&self) {
        self.core.request(StateTransition::Pop);
    }

    /// Routes an input event to the top state.
    ///
    /// Returns whether the top state consumed it; false when the stack is empty.
    pub fn handle_event(&self, event: &InputEvent) -> bool {
        let consumed = {
            let Ok(mut registry) = self.core.registry.try_borrow_mut() else {
                warn!("Input dropped: a state callback is already running");
                return false;
            };
            let top = self.core.stack.borrow().last().cloned();
            match top {
                Some(id) => registry
                    .get_mut(&id)
                    .map_or(false, |state| state.handle_event(event)),
                None => false,
            }
        };
        self.core.drain();
        consumed
    }

    /// Advances the top state by `dt` seconds.
    pub fn update(&self, dt: f32) {
        {
            let Ok(mut registry) = self.core.registry.try_borrow_mut() else {
                warn!("Update skipped: a state callback is already running");
                return;
            };
            let top = self.core.stack.borrow().last().cloned();
            if let Some(id) = top {
                if let Some(state) = registry.get_mut(&id) {
                    state.update(dt);
                }
            }
        }
        self.core.drain();
    }

    /// Renders every visible state on the stack, bottom to top.
    pub fn render(&self, surface: &mut dyn Surface) {
        {
            let Ok(registry) = self.core.registry.try_borrow() else {
                warn!("Render skipped: a state callback is already running");
                return;
            };
            let stack = self.core.stack.borrow().clone();
            for id in &stack {
                if let Some(state) = registry.get(id) {
                    if state.is_visible() {
                        state.render(surface);
                    }
                }
            }
        }
        self.core.drain();
    }

    pub fn set_persistent_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.core.persistent.set(key, value);
    }

    pub fn get_persistent_data(&self, key: &str) -> Option<Value> {
        self.core.persistent.get(key)
    }

    pub fn get_persistent_data_or(&self, key: &str, default: Value) -> Value {
        self.core.persistent.get_or(key, default)
    }

    pub fn persistent_data(&self) -> &PersistentData {
        &self.core.persistent
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.core.event_bus
    }

    /// A context for constructing states that belong to this manager.
    pub fn context(&self) -> StateContext {
        StateContext::new(self.core.event_bus.clone(), self.core.persistent.clone())
    }

    /// State ids on the stack, bottom first.
    pub fn stack(&self) -> Vec<String> {
        self.core.stack.borrow().clone()
    }

    /// Id of the top state.
    pub fn current_state(&self) -> Option<String> {
        self.core.stack.borrow().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.core.stack.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.stack.borrow().is_empty()
    }

    /// Number of transitions waiting for a running callback to finish.
    pub fn pending_transitions(&self) -> usize {
        self.core.pending.borrow().len()
    }

    pub fn is_registered(&self, state_id: &str) -> bool {
        self.core
            .registry
            .try_borrow()
            .map_or(false, |registry| registry.contains_key(state_id))
    }

    /// Registered state ids in sorted order.
    pub fn registered_states(&self) -> Vec<String> {
        let Ok(registry) = self.core.registry.try_borrow() else {
            return Vec::new();
        };
        let mut ids: Vec<String> = registry.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Runs `f` against the registered state `state_id`.
    ///
    /// Returns `None` if the id is unknown or a state callback is running.
    pub fn with_state<R>(&self, state_id: &str, f: impl FnOnce(&dyn GameState) -> R) -> Option<R> {
        let registry = self.core.registry.try_borrow().ok()?;
        registry.get(state_id).map(|state| f(state.as_ref()))
    }
}

fn transition_handler(event_type: &'static str, core: Weak<ManagerCore>) -> EventHandler {
    EventHandler::named(format!("state_manager.{}", event_type), move |payload| {
        let Some(core) = core.upgrade() else {
            return Ok(());
        };
        let transition = StateTransition::from_event(event_type, payload)?;
        core.request(transition);
        Ok(())
    })
}

impl Drop for StateManager {
    fn drop(&mut self) {
        for (event_type, handler) in &self.subscriptions {
            self.core.event_bus.unsubscribe(event_type, handler);
        }
    }
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("stack", &self.stack())
            .field("registered", &self.registered_states())
            .field("pending", &self.pending_transitions())
            .finish()
    }
}
