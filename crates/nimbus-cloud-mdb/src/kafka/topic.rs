//! Kafka topics of a cluster

use super::{cluster_path, kafka_version_suffix};
use crate::client::MdbClient;
use crate::wire;
use async_trait::async_trait;
use nimbus_cloud::{BoxedOperation, CallContext, Entity, FieldMask, Reconcilable, Result, Value};
use serde_json::json;
use std::collections::BTreeMap;

const TOPIC_CONFIG: &str = "topic_config";

/// int64 topic fields that arrive as strings
const INT_FIELDS: &[&str] = &["partitions", "replication_factor"];

/// Topic collection, keyed by topic name
pub struct KafkaTopics {
    client: MdbClient,
    mask: FieldMask,
    version_suffix: String,
}

impl KafkaTopics {
    /// `kafka_version` selects the `topic_config_<suffix>` message
    pub fn new(client: MdbClient, kafka_version: &str) -> Self {
        Self {
            client,
            mask: Self::update_mask(),
            version_suffix: kafka_version_suffix(kafka_version),
        }
    }

    pub fn update_mask() -> FieldMask {
        FieldMask::new()
            .leaf("partitions", "topic_spec.partitions")
            .leaf("replication_factor", "topic_spec.replication_factor")
            .computed("replication_factor")
            .nested(TOPIC_CONFIG, "topic_spec.topic_config_{version}")
    }

    fn topics_path(parent: &str) -> String {
        format!("{}/topics", cluster_path(parent))
    }

    fn topic_spec(&self, spec: &Entity) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("name".into(), json!(spec.key));
        for field in INT_FIELDS {
            if let Some(value) = spec.get(field) {
                body.insert((*field).into(), value.clone().into());
            }
        }
        if let Some(config) = spec.get(TOPIC_CONFIG).and_then(Value::as_block) {
            body.insert(
                format!("{}_{}", TOPIC_CONFIG, self.version_suffix),
                Value::Object(config.clone()).into(),
            );
        }
        serde_json::Value::Object(body)
    }

    fn decode(item: serde_json::Value) -> Result<Entity> {
        let serde_json::Value::Object(mut object) = item else {
            return Entity::from_json("name", item);
        };
        object.remove("cluster_id");
        wire::parse_int_fields(&mut object, INT_FIELDS);

        // topic_config_2_8, topic_config_3, ... collapse into one attribute
        let config_key = object
            .keys()
            .find(|k| k.starts_with(TOPIC_CONFIG))
            .cloned();
        if let Some(key) = config_key {
            if let Some(config) = object.remove(&key) {
                object.insert(TOPIC_CONFIG.into(), config);
            }
        }

        Ok(normalize_topic(Entity::from_json(
            "name",
            serde_json::Value::Object(object),
        )?))
    }
}

/// Bring a topic to its comparable form.
///
/// Topic settings are strings on the API (int64 wrappers) while declared
/// configuration usually carries plain numbers and booleans.
pub fn normalize_topic(mut topic: Entity) -> Entity {
    let Some(config) = topic.get(TOPIC_CONFIG).and_then(Value::as_block) else {
        return topic;
    };
    let config: BTreeMap<String, Value> = config
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Int(n) => Value::String(n.to_string()),
                Value::Float(f) => Value::String(f.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => other.clone(),
            };
            (k.clone(), v)
        })
        .collect();
    topic.set(TOPIC_CONFIG, config);
    topic
}

#[async_trait]
impl Reconcilable for KafkaTopics {
    fn resource_type(&self) -> &str {
        "kafka-topic"
    }

    fn field_mask(&self) -> &FieldMask {
        &self.mask
    }

    async fn list_entities(&self, _ctx: &CallContext, parent: &str) -> Result<Vec<Entity>> {
        let items = self
            .client
            .list_all(&Self::topics_path(parent), "topics")
            .await?;
        items.into_iter().map(Self::decode).collect()
    }

    async fn create_entity(
        &self,
        _ctx: &CallContext,
        parent: &str,
        spec: &Entity,
    ) -> Result<BoxedOperation> {
        let body = json!({ "topic_spec": self.topic_spec(spec) });
        tracing::debug!("Creating topic {} in {}: {}", spec.key, parent, body);
        let operation = self.client.post(&Self::topics_path(parent), &body).await?;
        Ok(Box::new(operation))
    }

    async fn update_entity(
        &self,
        _ctx: &CallContext,
        parent: &str,
        key: &str,
        spec: &Entity,
        changed_paths: &[String],
    ) -> Result<BoxedOperation> {
        let body = json!({
            "update_mask": changed_paths.join(","),
            "topic_spec": self.topic_spec(spec),
        });
        tracing::debug!("Updating topic {} in {}: {}", key, parent, body);
        let path = format!("{}/{}", Self::topics_path(parent), key);
        let operation = self.client.patch(&path, &body).await?;
        Ok(Box::new(operation))
    }

    async fn delete_entity(
        &self,
        _ctx: &CallContext,
        parent: &str,
        key: &str,
    ) -> Result<BoxedOperation> {
        let path = format!("{}/{}", Self::topics_path(parent), key);
        let operation = self.client.delete(&path).await?;
        Ok(Box::new(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_collapses_versioned_config() {
        let topic = KafkaTopics::decode(json!({
            "name": "events",
            "cluster_id": "c1",
            "partitions": "6",
            "replication_factor": "3",
            "topic_config_2_8": { "cleanup_policy": "CLEANUP_POLICY_DELETE", "retention_ms": "3600000" }
        }))
        .unwrap();

        assert_eq!(topic.key, "events");
        assert_eq!(topic.get_i64("partitions"), Some(6));
        assert_eq!(
            topic.lookup("topic_config.retention_ms").and_then(Value::as_str),
            Some("3600000")
        );
        assert!(topic.get("cluster_id").is_none());
    }

    #[test]
    fn test_normalized_desired_matches_observed() {
        let desired = normalize_topic(
            Entity::new("events")
                .with("partitions", 6)
                .with(TOPIC_CONFIG, vec![Value::Object(
                    [("retention_ms".to_string(), Value::Int(3_600_000))].into(),
                )]),
        );
        let observed = KafkaTopics::decode(json!({
            "name": "events",
            "partitions": "6",
            "topic_config_3": { "retention_ms": "3600000" }
        }))
        .unwrap();

        let paths = KafkaTopics::update_mask().changed_paths(&observed, &desired, "3");
        assert!(paths.is_empty(), "unexpected paths {paths:?}");
    }
}
