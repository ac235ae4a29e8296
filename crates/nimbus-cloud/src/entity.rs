//! Keyed entities and collections

use crate::error::{CloudError, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A named unit inside a parent resource (a topic, a user, a host)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique key within the parent collection
    pub key: String,

    /// Attribute name to value
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Resolve a dotted attribute path (`config.kafka.brokers_count`)
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            None => self.attributes.get(path),
            Some((head, rest)) => self.attributes.get(head)?.lookup(rest),
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Decode a JSON object, taking the key from `key_attr`.
    ///
    /// The key attribute stays in the attribute map so that request bodies
    /// built from the entity carry it.
    pub fn from_json(key_attr: &str, json: serde_json::Value) -> Result<Self> {
        let Value::Object(attributes) = Value::from(json) else {
            return Err(CloudError::Validation(format!(
                "expected an object with a {key_attr:?} attribute"
            )));
        };

        let key = match attributes.get(key_attr) {
            Some(Value::String(key)) => key.clone(),
            Some(other) => {
                return Err(CloudError::Validation(format!(
                    "attribute {key_attr:?} must be a string, got {other:?}"
                )));
            }
            None => {
                return Err(CloudError::Validation(format!(
                    "missing key attribute {key_attr:?}"
                )));
            }
        };

        Ok(Self { key, attributes })
    }

    /// Encode the attribute map back to JSON
    pub fn to_json(&self) -> serde_json::Value {
        Value::Object(self.attributes.clone()).into()
    }
}

/// Check that every key is non-empty and appears once
pub fn validate_unique_keys(entities: &[Entity]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entities.len());
    for entity in entities {
        if entity.key.is_empty() {
            return Err(CloudError::Validation("entity key must not be empty".into()));
        }
        if !seen.insert(entity.key.as_str()) {
            return Err(CloudError::Validation(format!(
                "duplicate entity key {:?}",
                entity.key
            )));
        }
    }
    Ok(())
}

/// Index entities by key; later duplicates win
pub fn index_by_key(entities: &[Entity]) -> BTreeMap<&str, &Entity> {
    entities.iter().map(|e| (e.key.as_str(), e)).collect()
}
