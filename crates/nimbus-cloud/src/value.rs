//! Typed attribute values
//!
//! Configuration sources hand over loosely typed JSON. It is decoded once at
//! the boundary into [`Value`], so that diffing works on a closed set of
//! shapes instead of arbitrary dynamic data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// View a single nested block as an object.
    ///
    /// Attribute bags store single blocks either directly or as a one-element
    /// list; both forms are accepted. An empty list reads as no block.
    pub fn as_block(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            Value::List(items) => items.first().and_then(Value::as_object),
            _ => None,
        }
    }

    /// Walk a dotted path through nested blocks
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_block()?.get(segment)?;
        }
        Some(current)
    }
}

/// Equality where an absent value and an explicit null are the same thing
pub fn same_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({
            "name": "events",
            "partitions": 3,
            "ratio": 0.5,
            "flags": [true, null],
        }));

        let obj = value.as_object().unwrap();
        assert_eq!(obj["name"], Value::String("events".into()));
        assert_eq!(obj["partitions"], Value::Int(3));
        assert_eq!(obj["ratio"], Value::Float(0.5));
        assert_eq!(
            obj["flags"],
            Value::List(vec![Value::Bool(true), Value::Null])
        );
    }

    #[test]
    fn test_lookup_through_single_block_list() {
        let value = Value::from(json!({
            "config": [{ "kafka": { "brokers": 3 } }]
        }));

        assert_eq!(value.lookup("config.kafka.brokers"), Some(&Value::Int(3)));
        assert_eq!(value.lookup("config.zookeeper"), None);
    }

    #[test]
    fn test_null_equals_absent() {
        assert!(same_value(None, Some(&Value::Null)));
        assert!(same_value(None, None));
        assert!(!same_value(None, Some(&Value::Int(0))));
        assert!(same_value(Some(&Value::Int(1)), Some(&Value::Int(1))));
    }
}
