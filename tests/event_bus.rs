//! Dispatch order, snapshot semantics and failure isolation of the event bus.

use log::{Level, Log, Metadata, Record};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Mutex;
use tapestry::{EventBus, EventHandler, TapestryError};

/// Keeps every warning logged by the tests in this file.
struct WarningLog {
    records: Mutex<Vec<String>>,
}

impl Log for WarningLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut records) = self.records.lock() {
                records.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

static WARNINGS: WarningLog = WarningLog {
    records: Mutex::new(Vec::new()),
};

/// Warnings so far that mention `needle`.
fn warnings_about(needle: &str) -> Vec<String> {
    // Another test may have installed the logger already
    let _ = log::set_logger(&WARNINGS);
    log::set_max_level(log::LevelFilter::Warn);
    WARNINGS
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|message| message.contains(needle))
        .cloned()
        .collect()
}

type Calls = Rc<RefCell<Vec<(&'static str, Value)>>>;

fn recorder(name: &'static str, calls: &Calls) -> EventHandler {
    let calls = Rc::clone(calls);
    EventHandler::named(name, move |payload| {
        calls.borrow_mut().push((name, payload.clone()));
        Ok(())
    })
}

#[test]
fn test_handlers_run_in_subscription_order_with_payload() {
    let bus = EventBus::new();
    let calls = Calls::default();
    bus.subscribe("dmg", recorder("h1", &calls));
    bus.subscribe("dmg", recorder("h2", &calls));

    bus.publish("dmg", json!({"amount": 5}));

    assert_eq!(
        *calls.borrow(),
        vec![("h1", json!({"amount": 5})), ("h2", json!({"amount": 5}))]
    );
}

#[test]
fn test_double_unsubscribe_is_harmless() {
    let bus = EventBus::new();
    let calls = Calls::default();
    let h1 = recorder("h1", &calls);
    bus.subscribe("double_unsubscribe", h1.clone());
    assert!(warnings_about("'double_unsubscribe'").is_empty());

    assert!(bus.unsubscribe("double_unsubscribe", &h1));
    assert!(warnings_about("'double_unsubscribe'").is_empty());
    assert!(!bus.unsubscribe("double_unsubscribe", &h1));
    assert_eq!(
        warnings_about("'double_unsubscribe'"),
        vec!["Attempted to unsubscribe handler 'h1' not registered for 'double_unsubscribe'"]
    );

    bus.publish("double_unsubscribe", Value::Null);
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_self_unsubscribe_does_not_skip_later_handlers() {
    let bus = EventBus::new();
    let calls = Calls::default();

    let slot: Rc<RefCell<Option<EventHandler>>> = Rc::default();
    let leaving = {
        let bus = bus.clone();
        let slot = Rc::clone(&slot);
        let calls = Rc::clone(&calls);
        EventHandler::named("leaving", move |payload| {
            calls.borrow_mut().push(("leaving", payload.clone()));
            if let Some(me) = slot.borrow().as_ref() {
                bus.unsubscribe("tick", me);
            }
            Ok(())
        })
    };
    *slot.borrow_mut() = Some(leaving.clone());

    bus.subscribe("tick", recorder("first", &calls));
    bus.subscribe("tick", leaving);
    bus.subscribe("tick", recorder("last", &calls));

    bus.publish("tick", Value::Null);
    let names: Vec<&str> = calls.borrow().iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["first", "leaving", "last"]);
    assert_eq!(bus.subscriber_count("tick"), 2);

    bus.publish("tick", Value::Null);
    assert_eq!(calls.borrow().len(), 5);

    // Break the handler's reference to itself
    slot.borrow_mut().take();
}

#[test]
fn test_failing_handlers_are_isolated() {
    let bus = EventBus::new();
    let calls = Calls::default();
    bus.subscribe(
        "x",
        EventHandler::named("erroring", |_| Err(TapestryError::Handler("boom".to_string()))),
    );
    bus.subscribe(
        "x",
        EventHandler::named("panicking", |_| panic!("handler exploded")),
    );
    bus.subscribe("x", recorder("h2", &calls));

    bus.publish("x", json!({"n": 1}));

    assert_eq!(*calls.borrow(), vec![("h2", json!({"n": 1}))]);
}
