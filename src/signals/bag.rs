//! Best-effort access to untyped trigger payloads.
//!
//! Upstream sources (CSV imports, enrichment APIs, hand-edited records) all
//! write triggers in slightly different shapes: booleans, objects with a
//! recency field, numeric strings, single entries or arrays. `TriggerBag`
//! wraps the raw JSON map and exposes accessors that return `Option` instead
//! of assuming any field is present or well-typed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// An untyped map of named trigger observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TriggerBag {
    fields: Map<String, Value>,
}

impl TriggerBag {
    /// Build a bag from any JSON value. Non-objects produce an empty bag.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self { fields: map.clone() },
            _ => Self::default(),
        }
    }

    /// Parse a bag from a JSON string column. Unparseable text is an empty bag.
    pub fn from_json_str(raw: Option<&str>) -> Self {
        raw.and_then(|s| serde_json::from_str::<Value>(s).ok())
            .map(|v| Self::from_value(Some(&v)))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Value::is_null)
    }

    /// Get a field, treating JSON `null` as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// First present field among `keys` (alias lookup).
    pub fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Numeric value of the first present alias, accepting numeric strings.
    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        self.first_of(keys).and_then(as_number)
    }

    /// All entries under the first present alias: an array is flattened,
    /// anything else is a single entry.
    pub fn entries(&self, keys: &[&str]) -> Vec<&Value> {
        match self.first_of(keys) {
            Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
            Some(other) => vec![other],
            None => Vec::new(),
        }
    }

    /// Fill fields missing from `self` with those from `secondary`.
    /// Present fields in `self` always win.
    pub fn merged_with(&self, secondary: &TriggerBag) -> TriggerBag {
        let mut fields = self.fields.clone();
        for (key, value) in &secondary.fields {
            let missing = fields.get(key).map(Value::is_null).unwrap_or(true);
            if missing && !value.is_null() {
                fields.insert(key.clone(), value.clone());
            }
        }
        TriggerBag { fields }
    }
}

impl From<Value> for TriggerBag {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

impl<'de> Deserialize<'de> for TriggerBag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?.into())
    }
}

/// Coerce a JSON value to a finite number. Numeric strings are accepted.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Loose truthiness: `false`, `0`, `""`, `null`, `{}` and `[]` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Numeric field of an object by alias, if the value is an object.
pub fn object_number(value: &Value, keys: &[&str]) -> Option<f64> {
    let obj = value.as_object()?;
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
        .and_then(as_number)
}

/// String field of an object by alias, trimmed and non-empty.
pub fn object_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    let obj = value.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}
