//! JSON wire helpers
//!
//! The REST gateway answers in lowerCamelCase and accepts both camel and
//! proto field names on input. Entities use proto (snake_case) names, so
//! responses are normalised once on read and requests are sent as-is.

use serde_json::{Map, Value};

/// Objects whose keys are user data and must not be renamed
const OPAQUE_MAPS: &[&str] = &["labels"];

pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Rename every object key to snake_case, recursively
pub(crate) fn snake_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let key = snake_case(&k);
                    let v = if OPAQUE_MAPS.contains(&key.as_str()) {
                        v
                    } else {
                        snake_keys(v)
                    };
                    (key, v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_keys).collect()),
        other => other,
    }
}

/// int64 fields travel as JSON strings; turn the named ones back into numbers
pub(crate) fn parse_int_fields(object: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(Value::String(s)) = object.get(*field) {
            if let Ok(n) = s.parse::<i64>() {
                object.insert((*field).to_string(), Value::from(n));
            }
        }
    }
}

/// Collapse one-element lists of objects into the object, recursively.
///
/// Single nested blocks are stored as one-element lists in the attribute
/// model but are plain messages on the wire.
pub(crate) fn unwrap_blocks(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => {
            unwrap_blocks(items.remove(0))
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_blocks).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, unwrap_blocks(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Extract `items_field` from a list response, defaulting to empty
pub(crate) fn take_items(response: &mut Value, items_field: &str) -> Vec<Value> {
    match response.get_mut(items_field).map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("replicationFactor"), "replication_factor");
        assert_eq!(snake_case("topicConfig_2_8"), "topic_config_2_8");
        assert_eq!(snake_case("name"), "name");
    }

    #[test]
    fn test_snake_keys_keeps_labels() {
        let value = snake_keys(json!({
            "assignPublicIp": true,
            "labels": { "teamName": "core" },
            "hosts": [{ "zoneId": "ru-central1-a" }]
        }));
        assert_eq!(
            value,
            json!({
                "assign_public_ip": true,
                "labels": { "teamName": "core" },
                "hosts": [{ "zone_id": "ru-central1-a" }]
            })
        );
    }

    #[test]
    fn test_unwrap_blocks() {
        let value = unwrap_blocks(json!({
            "kafka": [{ "resources": [{ "disk_size": 10 }] }],
            "zones": ["a"]
        }));
        assert_eq!(
            value,
            json!({ "kafka": { "resources": { "disk_size": 10 } }, "zones": ["a"] })
        );
    }

    #[test]
    fn test_parse_int_fields() {
        let mut object = json!({ "partitions": "12", "name": "7" })
            .as_object()
            .cloned()
            .unwrap();
        parse_int_fields(&mut object, &["partitions"]);
        assert_eq!(object["partitions"], json!(12));
        assert_eq!(object["name"], json!("7"));
    }
}
