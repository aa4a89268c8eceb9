//! # Event Bus
//!
//! Synchronous publish/subscribe hub.
//!
//! Handlers are registered per event type and invoked in registration order. Each
//! `publish` dispatches over a snapshot of the subscriber list, so a handler may
//! subscribe or unsubscribe (itself included) without disturbing the cycle that is
//! currently running. A handler that returns an error or panics is logged and the
//! remaining handlers still run; the publisher never sees the failure.

use crate::TapestryResult;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

type Callback = dyn Fn(&Value) -> TapestryResult<()>;

/// A shareable event callback.
///
/// Identity is the identity of the wrapped closure: clones of one handler are the
/// same handler, two handlers built from identical closures are not. Subscribing a
/// handler twice registers it twice.
#[derive(Clone)]
pub struct EventHandler {
    label: Option<Rc<str>>,
    callback: Rc<Callback>,
}

impl EventHandler {
    /// Wraps a closure as an anonymous handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use tapestry::{EventBus, EventHandler};
    ///
    /// let bus = EventBus::new();
    /// let handler = EventHandler::new(|_payload| Ok(()));
    /// bus.subscribe("dmg", handler.clone());
    /// assert!(bus.unsubscribe("dmg", &handler));
    /// ```
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Value) -> TapestryResult<()> + 'static,
    {
        Self {
            label: None,
            callback: Rc::new(callback),
        }
    }

    /// Wraps a closure with a label that identifies the handler in log output.
    pub fn named<F>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Value) -> TapestryResult<()> + 'static,
    {
        Self {
            label: Some(Rc::from(label.into())),
            callback: Rc::new(callback),
        }
    }

    /// Returns the handler label, or `<anonymous>`.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("<anonymous>")
    }

    /// Returns true if both values refer to the same registered closure.
    pub fn same_as(&self, other: &EventHandler) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    fn invoke(&self, payload: &Value) -> TapestryResult<()> {
        (self.callback)(payload)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("label", &self.label())
            .finish()
    }
}

/// Publish/subscribe hub shared by every subsystem.
///
/// `EventBus` is a cheap handle; clones share one subscriber table. The bus is
/// single-threaded by construction.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<HashMap<String, Vec<EventHandler>>>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        info!("EventBus initialized");
        Self::default()
    }

    /// Registers `handler` for every future publish of `event_type`.
    pub fn subscribe(&self, event_type: impl Into<String>, handler: EventHandler) {
        let event_type = event_type.into();
        debug!("Handler '{}' subscribed to '{}'", handler.label(), event_type);
        self.subscribers
            .borrow_mut()
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Removes the first registration of `handler` for `event_type`.
    ///
    /// Returns whether a registration was removed. Unsubscribing a handler that is
    /// not registered is logged and otherwise ignored.
    pub fn unsubscribe(&self, event_type: &str, handler: &EventHandler) -> bool {
        let removed = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers
                .get_mut(event_type)
                .and_then(|list| {
                    list.iter()
                        .position(|registered| registered.same_as(handler))
                        .map(|index| list.remove(index))
                })
                .is_some()
        };

        if removed {
            debug!("Handler '{}' unsubscribed from '{}'", handler.label(), event_type);
        } else {
            warn!(
                "Attempted to unsubscribe handler '{}' not registered for '{}'",
                handler.label(),
                event_type
            );
        }
        removed
    }

    /// Invokes every handler registered for `event_type`, in registration order.
    ///
    /// Publishing an event type nobody listens to is a no-op.
    pub fn publish(&self, event_type: &str, payload: Value) {
        let snapshot: Vec<EventHandler> = match self.subscribers.borrow().get(event_type) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => {
                debug!("Published '{}' with no subscribers", event_type);
                return;
            }
        };

        debug!(
            "Publishing '{}' to {} subscriber(s)",
            event_type,
            snapshot.len()
        );

        for handler in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(&payload))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    "Error in event handler '{}' for '{}': {}",
                    handler.label(),
                    event_type,
                    e
                ),
                Err(cause) => error!(
                    "Event handler '{}' panicked while handling '{}': {}",
                    handler.label(),
                    event_type,
                    panic_message(cause.as_ref())
                ),
            }
        }
    }

    /// Number of registrations for `event_type`.
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscribers
            .borrow()
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Removes every registration for every event type.
    pub fn clear_subscribers(&self) {
        self.subscribers.borrow_mut().clear();
        debug!("Cleared all event subscribers");
    }

    /// Removes every registration for one event type.
    pub fn clear_event_subscribers(&self, event_type: &str) {
        if let Some(list) = self.subscribers.borrow_mut().get_mut(event_type) {
            list.clear();
            debug!("Cleared subscribers for '{}'", event_type);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.borrow();
        let mut types: Vec<(&String, usize)> =
            subscribers.iter().map(|(k, v)| (k, v.len())).collect();
        types.sort();
        f.debug_struct("EventBus").field("subscribers", &types).finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TapestryError;
    use serde_json::json;
    use std::cell::Cell;

    fn counter(hits: &Rc<Cell<u32>>) -> EventHandler {
        let hits = Rc::clone(hits);
        EventHandler::new(move |_| {
            hits.set(hits.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish("nobody_listens", json!({"x": 1}));
        assert_eq!(bus.subscriber_count("nobody_listens"), 0);
    }

    #[test]
    fn test_same_handler_registered_twice_fires_twice() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let handler = counter(&hits);

        bus.subscribe("tick", handler.clone());
        bus.subscribe("tick", handler.clone());
        bus.publish("tick", Value::Null);
        assert_eq!(hits.get(), 2);

        // Only the first registration goes away
        assert!(bus.unsubscribe("tick", &handler));
        bus.publish("tick", Value::Null);
        assert_eq!(hits.get(), 3);
        assert_eq!(bus.subscriber_count("tick"), 1);
    }

    #[test]
    fn test_clones_share_identity() {
        let a = EventHandler::new(|_| Ok(()));
        let b = EventHandler::new(|_| Ok(()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_error_and_panic_are_contained() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        bus.subscribe(
            "boom",
            EventHandler::named("failing", |_| {
                Err(TapestryError::Handler("refused".to_string()))
            }),
        );
        bus.subscribe(
            "boom",
            EventHandler::named("panicking", |_| panic!("handler exploded")),
        );
        bus.subscribe("boom", counter(&hits));

        bus.publish("boom", Value::Null);
        assert_eq!(hits.get(), 1);

        // The bus is still usable afterwards
        bus.publish("boom", Value::Null);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_subscribe_during_publish_waits_for_next_cycle() {
        let bus = EventBus::new();
        let late_hits = Rc::new(Cell::new(0));
        let late = counter(&late_hits);

        let bus_handle = bus.clone();
        let late_handle = late.clone();
        bus.subscribe(
            "spawn",
            EventHandler::new(move |_| {
                bus_handle.subscribe("spawn", late_handle.clone());
                Ok(())
            }),
        );

        bus.publish("spawn", Value::Null);
        assert_eq!(late_hits.get(), 0);

        bus.publish("spawn", Value::Null);
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_clear_operations() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        bus.subscribe("a", counter(&hits));
        bus.subscribe("b", counter(&hits));

        bus.clear_event_subscribers("a");
        bus.publish("a", Value::Null);
        bus.publish("b", Value::Null);
        assert_eq!(hits.get(), 1);

        bus.clear_subscribers();
        bus.publish("b", Value::Null);
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count("b"), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
