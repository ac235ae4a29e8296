//! Kafka users of a cluster

use super::cluster_path;
use crate::client::MdbClient;
use async_trait::async_trait;
use nimbus_cloud::{BoxedOperation, CallContext, Entity, FieldMask, Reconcilable, Result};
use serde_json::json;

/// User collection, keyed by user name.
///
/// Passwords are never returned by the API; they are compared against the
/// previously applied configuration instead.
pub struct KafkaUsers {
    client: MdbClient,
    mask: FieldMask,
}

impl KafkaUsers {
    pub fn new(client: MdbClient) -> Self {
        Self {
            client,
            mask: Self::update_mask(),
        }
    }

    pub fn update_mask() -> FieldMask {
        FieldMask::new()
            .leaf("password", "password")
            .leaf("permissions", "permissions")
            .write_only("password")
    }

    fn users_path(parent: &str) -> String {
        format!("{}/users", cluster_path(parent))
    }

    fn decode(item: serde_json::Value) -> Result<Entity> {
        let mut user = Entity::from_json("name", item)?;
        user.attributes.remove("cluster_id");
        Ok(user)
    }
}

#[async_trait]
impl Reconcilable for KafkaUsers {
    fn resource_type(&self) -> &str {
        "kafka-user"
    }

    fn field_mask(&self) -> &FieldMask {
        &self.mask
    }

    async fn list_entities(&self, _ctx: &CallContext, parent: &str) -> Result<Vec<Entity>> {
        let items = self
            .client
            .list_all(&Self::users_path(parent), "users")
            .await?;
        items.into_iter().map(Self::decode).collect()
    }

    async fn create_entity(
        &self,
        _ctx: &CallContext,
        parent: &str,
        spec: &Entity,
    ) -> Result<BoxedOperation> {
        let mut user_spec = spec.to_json();
        user_spec["name"] = json!(spec.key);
        tracing::debug!("Creating Kafka user {} in {}", spec.key, parent);
        let operation = self
            .client
            .post(&Self::users_path(parent), &json!({ "user_spec": user_spec }))
            .await?;
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
        let mut body = json!({ "update_mask": changed_paths.join(",") });
        for field in ["password", "permissions"] {
            if let Some(value) = spec.get(field) {
                body[field] = value.clone().into();
            }
        }
        tracing::debug!("Updating Kafka user {} in {}: {:?}", key, parent, changed_paths);
        let path = format!("{}/{}", Self::users_path(parent), key);
        let operation = self.client.patch(&path, &body).await?;
        Ok(Box::new(operation))
    }

    async fn delete_entity(
        &self,
        _ctx: &CallContext,
        parent: &str,
        key: &str,
    ) -> Result<BoxedOperation> {
        tracing::debug!("Deleting Kafka user {} within {}", key, parent);
        let path = format!("{}/{}", Self::users_path(parent), key);
        let operation = self.client.delete(&path).await?;
        Ok(Box::new(operation))
    }
}
