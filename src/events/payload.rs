//! # Event Payloads
//!
//! Defensive accessors for JSON event payloads.
//!
//! Publishers own the shape of their payloads and the bus never validates them.
//! Subscribers therefore read every field with a default, so a `null` payload or a
//! missing key degrades to the default instead of an error.

use serde_json::{Map, Value};

/// Lenient field access on event payloads.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tapestry::PayloadExt;
///
/// let payload = json!({"title": "Saved", "duration": 2.0});
/// assert_eq!(payload.str_or("title", "Notification"), "Saved");
/// assert_eq!(payload.str_or("message", ""), "");
/// assert_eq!(payload.f64_or("duration", 3.0), 2.0);
/// assert_eq!(serde_json::Value::Null.f64_or("duration", 3.0), 3.0);
/// ```
pub trait PayloadExt {
    /// Returns the string at `key`, if present and a string.
    fn str_field(&self, key: &str) -> Option<&str>;

    /// Returns the string at `key`, or `default`.
    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.str_field(key).unwrap_or(default)
    }

    /// Returns the number at `key`, or `default`.
    fn f64_or(&self, key: &str, default: f64) -> f64;

    /// Returns the non-negative integer at `key`, or `default`.
    fn u64_or(&self, key: &str, default: u64) -> u64;

    /// Returns the boolean at `key`, or `default`.
    fn bool_or(&self, key: &str, default: bool) -> bool;

    /// Returns a copy of the object at `key`, if present and an object.
    fn object(&self, key: &str) -> Option<Map<String, Value>>;
}

impl PayloadExt for Value {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn u64_or(&self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            Some(value) => value
                .as_u64()
                // Whole floats such as 3.0 are accepted as counts
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                        .map(|f| f as u64)
                })
                .unwrap_or(default),
            None => default,
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    fn object(&self, key: &str) -> Option<Map<String, Value>> {
        self.get(key).and_then(Value::as_object).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mistyped_fields_fall_back() {
        let payload = json!({"title": 12, "duration": "long", "amount": -1});
        assert_eq!(payload.str_or("title", "Notification"), "Notification");
        assert_eq!(payload.f64_or("duration", 3.0), 3.0);
        assert_eq!(payload.u64_or("amount", 1), 1);
    }

    #[test]
    fn test_counts_accept_whole_floats() {
        let payload = json!({"amount": 3.0, "partial": 2.5});
        assert_eq!(payload.u64_or("amount", 1), 3);
        assert_eq!(payload.u64_or("partial", 1), 1);
    }

    #[test]
    fn test_object_field() {
        let payload = json!({"data": {"reason": "user"}, "state_id": "pause"});
        let data = payload.object("data").unwrap();
        assert_eq!(data["reason"], "user");
        assert!(payload.object("state_id").is_none());
        assert!(Value::Null.object("data").is_none());
    }

    #[test]
    fn test_non_object_payloads() {
        let payload = json!(["not", "a", "map"]);
        assert!(payload.str_field("title").is_none());
        assert!(!payload.bool_or("success", false));
    }
}
