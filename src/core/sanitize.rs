//! Result sanitization
//!
//! Records and validation reports cross the trust boundary through the
//! [`Sanitizer`] before they are serialized. Failure-shaped objects are
//! rebuilt from configured allow-lists, everything else is walked
//! recursively with order and length preserved. The sanitizer consumes its
//! input and emits fresh plain JSON, so applying it twice is the identity.

use serde_json::{Map, Value};

use super::store::{Record, ValidationFailure};

/// Top-level fields kept on a failure-shaped object, in output order.
pub const DEFAULT_ITEM_FIELDS: &[&str] = &["name", "errors", "fields"];

/// Fields kept on each validation entry, in output order.
pub const DEFAULT_ERROR_FIELDS: &[&str] = &[
    "message",
    "type",
    "path",
    "value",
    "origin",
    "validatorKey",
    "validatorName",
    "validatorArgs",
];

/// Allow-list driven result cleaner.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    item_fields: Vec<String>,
    error_fields: Vec<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_ITEM_FIELDS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_ERROR_FIELDS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl Sanitizer {
    pub fn new(item_fields: Vec<String>, error_fields: Vec<String>) -> Self {
        Self {
            item_fields,
            error_fields,
        }
    }

    /// Resolve a record and clean its JSON projection.
    pub fn record(&self, record: Record) -> Value {
        self.value(record.into_plain())
    }

    /// Clean an arbitrary JSON tree.
    ///
    /// Objects that look like validation failures (a string `name` next to
    /// an `errors` array) are rebuilt from the allow-lists; other containers
    /// are walked recursively.
    pub fn value(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                if is_failure_shaped(&map) {
                    self.rebuild_failure_map(&map)
                } else {
                    Value::Object(
                        map.into_iter()
                            .map(|(key, inner)| (key, self.value(inner)))
                            .collect(),
                    )
                }
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.value(item)).collect())
            }
            scalar => scalar,
        }
    }

    /// Rebuild a structured validation report into its wire shape.
    pub fn failure(&self, failure: &ValidationFailure) -> Value {
        let raw = serde_json::to_value(failure).unwrap_or(Value::Null);
        match raw {
            Value::Object(map) => self.rebuild_failure_map(&map),
            other => other,
        }
    }

    fn rebuild_failure_map(&self, map: &Map<String, Value>) -> Value {
        let mut out = Map::new();
        for field in &self.item_fields {
            match field.as_str() {
                // `name` travels as `error` on the wire
                "name" => {
                    if let Some(name) = map.get("name") {
                        out.insert("error".to_string(), name.clone());
                    }
                }
                "errors" => {
                    if let Some(Value::Array(entries)) = map.get("errors") {
                        let cleaned = entries
                            .iter()
                            .map(|entry| self.rebuild_error_entry(entry))
                            .collect();
                        out.insert("errors".to_string(), Value::Array(cleaned));
                    }
                }
                other => {
                    if let Some(value) = map.get(other) {
                        if !value.is_null() {
                            out.insert(other.to_string(), value.clone());
                        }
                    }
                }
            }
        }
        Value::Object(out)
    }

    fn rebuild_error_entry(&self, entry: &Value) -> Value {
        let Value::Object(map) = entry else {
            return entry.clone();
        };
        let mut out = Map::new();
        for field in &self.error_fields {
            if let Some(value) = map.get(field) {
                out.insert(field.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

fn is_failure_shaped(map: &Map<String, Value>) -> bool {
    if !matches!(map.get("name"), Some(Value::String(_))) {
        return false;
    }
    // Validation entries are always objects; a record that merely carries a
    // `name` string next to some other `errors` array must pass untouched.
    match map.get("errors") {
        Some(Value::Array(entries)) => {
            !entries.is_empty() && entries.iter().all(Value::is_object)
        }
        _ => false,
    }
}
