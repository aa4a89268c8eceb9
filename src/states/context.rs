//! # State Context
//!
//! What a game state is allowed to touch outside itself.

use crate::events::{EventBus, POP_STATE, PUSH_STATE, REQUEST_STATE_CHANGE, SHOW_NOTIFICATION};
use crate::states::{PersistentData, StateData};
use serde_json::{json, Value};

/// Handles injected into every state at construction.
///
/// A state can publish events and read or write persistent data through its
/// context. It cannot reach the state stack: transitions are requested by
/// publishing the events the [`StateManager`](crate::StateManager) subscribes to.
#[derive(Debug, Clone)]
pub struct StateContext {
    event_bus: EventBus,
    persistent: PersistentData,
}

impl StateContext {
    pub fn new(event_bus: EventBus, persistent: PersistentData) -> Self {
        Self {
            event_bus,
            persistent,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn persistent(&self) -> &PersistentData {
        &self.persistent
    }

    /// Publishes an arbitrary event.
    pub fn publish(&self, event_type: &str, payload: Value) {
        self.event_bus.publish(event_type, payload);
    }

    /// Publishes a `show_notification` event.
    pub fn notify(&self, title: &str, message: &str, duration: f64) {
        self.publish(
            SHOW_NOTIFICATION,
            json!({"title": title, "message": message, "duration": duration}),
        );
    }

    /// Requests a full stack replacement.
    pub fn request_change(&self, state_id: &str, data: Option<StateData>) {
        self.publish(REQUEST_STATE_CHANGE, transition_payload(state_id, data));
    }

    /// Requests an overlay push.
    pub fn request_push(&self, state_id: &str, data: Option<StateData>) {
        self.publish(PUSH_STATE, transition_payload(state_id, data));
    }

    /// Requests that the top state be popped.
    pub fn request_pop(&self) {
        self.publish(POP_STATE, Value::Null);
    }
}

fn transition_payload(state_id: &str, data: Option<StateData>) -> Value {
    json!({
        "state_id": state_id,
        "data": data.map_or(Value::Null, Value::Object),
    })
}
