//! # Persistent Data
//!
//! Key-value store that outlives every individual state.
//!
//! This is the sanctioned channel for handing data across a full stack
//! replacement (the generated world, the player character, the player's world
//! position). Values are JSON so the save system can persist the same key space
//! without knowing what the keys mean.

use crate::states::StateData;
use crate::TapestryResult;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to the persistent store.
///
/// Clones refer to the same store. Access is single-threaded and every borrow is
/// released before the accessor returns, so the store may be read or written from
/// inside any state callback or event handler.
#[derive(Debug, Clone, Default)]
pub struct PersistentData {
    values: Rc<RefCell<StateData>>,
}

impl PersistentData {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// Returns a copy of the value stored under `key`, or `default`.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Deserializes the value stored under `key`.
    ///
    /// A value that does not match `T` is logged and treated as absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Persistent value '{}' has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.borrow_mut().insert(key.into(), value.into());
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set_as<T: Serialize>(&self, key: impl Into<String>, value: &T) -> TapestryResult<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value);
        Ok(())
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.borrow_mut().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Copies every entry out of the store.
    pub fn snapshot(&self) -> StateData {
        self.values.borrow().clone()
    }

    /// Builds a transition payload: a copy of the store with `data` laid over it.
    ///
    /// The store itself is never modified, so the receiving state may mutate the
    /// result freely.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use tapestry::PersistentData;
    ///
    /// let store = PersistentData::new();
    /// store.set("a", 1);
    /// store.set("b", 2);
    ///
    /// let data = json!({"b": 3, "c": 4}).as_object().cloned();
    /// let merged = store.overlay(data);
    /// assert_eq!(serde_json::Value::Object(merged), json!({"a": 1, "b": 3, "c": 4}));
    /// assert_eq!(store.get("b"), Some(json!(2)));
    /// ```
    pub fn overlay(&self, data: Option<StateData>) -> StateData {
        let mut merged = self.snapshot();
        if let Some(data) = data {
            merged.extend(data);
        }
        merged
    }

    /// Merges `data` into the store, overwriting existing keys.
    pub fn extend(&self, data: StateData) {
        self.values.borrow_mut().extend(data);
    }

    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }
}
