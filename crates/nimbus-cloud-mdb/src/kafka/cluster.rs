//! Kafka cluster level operations
//!
//! Cluster parameters are not a keyed collection: the whole cluster is
//! compared against its previous declaration and a single partial update is
//! sent for the attributes that changed.

use super::{cluster_path, kafka_version_suffix};
use crate::client::MdbClient;
use crate::operation::RemoteOperation;
use crate::wire;
use nimbus_cloud::{
    CallContext, CloudError, EngineConfig, Entity, FieldMask, OperationHandle, Result,
    retry_conflicting_operation,
};
use serde_json::{Map, Value as Json, json};
use std::future::Future;
use std::time::Duration;

/// Cluster attribute to API field path
pub const KAFKA_CLUSTER_FIELDS: &[(&str, &str)] = &[
    ("name", "name"),
    ("description", "description"),
    ("labels", "labels"),
    ("network_id", "network_id"),
    ("security_group_ids", "security_group_ids"),
    ("deletion_protection", "deletion_protection"),
    ("maintenance_window", "maintenance_window"),
    ("subnet_ids", "subnet_ids"),
    ("config.zones", "config_spec.zone_id"),
    ("config.version", "config_spec.version"),
    ("config.brokers_count", "config_spec.brokers_count"),
    ("config.assign_public_ip", "config_spec.assign_public_ip"),
    ("config.schema_registry", "config_spec.schema_registry"),
    ("config.access", "config_spec.access"),
    ("config.disk_size_autoscaling.disk_size_limit", "config_spec.disk_size_autoscaling.disk_size_limit"),
    ("config.disk_size_autoscaling.planned_usage_threshold", "config_spec.disk_size_autoscaling.planned_usage_threshold"),
    ("config.disk_size_autoscaling.emergency_usage_threshold", "config_spec.disk_size_autoscaling.emergency_usage_threshold"),
    ("config.kafka.resources.resource_preset_id", "config_spec.kafka.resources.resource_preset_id"),
    ("config.kafka.resources.disk_type_id", "config_spec.kafka.resources.disk_type_id"),
    ("config.kafka.resources.disk_size", "config_spec.kafka.resources.disk_size"),
    ("config.kafka.kafka_config.compression_type", "config_spec.kafka.kafka_config_{version}.compression_type"),
    ("config.kafka.kafka_config.log_flush_interval_messages", "config_spec.kafka.kafka_config_{version}.log_flush_interval_messages"),
    ("config.kafka.kafka_config.log_flush_interval_ms", "config_spec.kafka.kafka_config_{version}.log_flush_interval_ms"),
    ("config.kafka.kafka_config.log_flush_scheduler_interval_ms", "config_spec.kafka.kafka_config_{version}.log_flush_scheduler_interval_ms"),
    ("config.kafka.kafka_config.log_retention_bytes", "config_spec.kafka.kafka_config_{version}.log_retention_bytes"),
    ("config.kafka.kafka_config.log_retention_hours", "config_spec.kafka.kafka_config_{version}.log_retention_hours"),
    ("config.kafka.kafka_config.log_retention_minutes", "config_spec.kafka.kafka_config_{version}.log_retention_minutes"),
    ("config.kafka.kafka_config.log_retention_ms", "config_spec.kafka.kafka_config_{version}.log_retention_ms"),
    ("config.kafka.kafka_config.log_segment_bytes", "config_spec.kafka.kafka_config_{version}.log_segment_bytes"),
    ("config.kafka.kafka_config.log_preallocate", "config_spec.kafka.kafka_config_{version}.log_preallocate"),
    ("config.kafka.kafka_config.socket_send_buffer_bytes", "config_spec.kafka.kafka_config_{version}.socket_send_buffer_bytes"),
    ("config.kafka.kafka_config.socket_receive_buffer_bytes", "config_spec.kafka.kafka_config_{version}.socket_receive_buffer_bytes"),
    ("config.kafka.kafka_config.auto_create_topics_enable", "config_spec.kafka.kafka_config_{version}.auto_create_topics_enable"),
    ("config.kafka.kafka_config.num_partitions", "config_spec.kafka.kafka_config_{version}.num_partitions"),
    ("config.kafka.kafka_config.default_replication_factor", "config_spec.kafka.kafka_config_{version}.default_replication_factor"),
    ("config.kafka.kafka_config.message_max_bytes", "config_spec.kafka.kafka_config_{version}.message_max_bytes"),
    ("config.kafka.kafka_config.replica_fetch_max_bytes", "config_spec.kafka.kafka_config_{version}.replica_fetch_max_bytes"),
    ("config.kafka.kafka_config.ssl_cipher_suites", "config_spec.kafka.kafka_config_{version}.ssl_cipher_suites"),
    ("config.kafka.kafka_config.offsets_retention_minutes", "config_spec.kafka.kafka_config_{version}.offsets_retention_minutes"),
    ("config.kafka.kafka_config.sasl_enabled_mechanisms", "config_spec.kafka.kafka_config_{version}.sasl_enabled_mechanisms"),
    ("config.zookeeper.resources.resource_preset_id", "config_spec.zookeeper.resources.resource_preset_id"),
    ("config.zookeeper.resources.disk_type_id", "config_spec.zookeeper.resources.disk_type_id"),
    ("config.zookeeper.resources.disk_size", "config_spec.zookeeper.resources.disk_size"),
];

/// Top-level cluster fields copied into the update request
const TOP_LEVEL_FIELDS: &[&str] = &[
    "name",
    "description",
    "labels",
    "network_id",
    "security_group_ids",
    "deletion_protection",
    "maintenance_window",
    "subnet_ids",
];

/// Kafka cluster handle
pub struct KafkaCluster {
    client: MdbClient,
    config: EngineConfig,
    mask: FieldMask,
}

impl KafkaCluster {
    pub fn new(client: MdbClient, config: EngineConfig) -> Self {
        Self {
            client,
            config,
            mask: FieldMask::from_table(KAFKA_CLUSTER_FIELDS.iter().copied()),
        }
    }

    pub fn update_mask(&self) -> &FieldMask {
        &self.mask
    }

    /// Fetch the cluster resource, keyed by its id
    pub async fn get(&self, ctx: &CallContext, cluster: &str) -> Result<Entity> {
        let read_ctx = ctx.child_with_timeout(self.config.timeouts.read);
        let json = read_ctx
            .run(async { self.client.get(&cluster_path(cluster)).await.map_err(CloudError::from) })
            .await?;
        Entity::from_json("id", json)
    }

    /// Send one partial update covering every changed cluster attribute.
    ///
    /// Returns `false` without calling the API when nothing changed.
    pub async fn update_params(
        &self,
        ctx: &CallContext,
        cluster: &str,
        old: &Entity,
        new: &Entity,
        version: &str,
    ) -> Result<bool> {
        let suffix = kafka_version_suffix(version);
        let paths = self.mask.changed_paths(old, new, &suffix);
        if paths.is_empty() {
            tracing::debug!("Kafka cluster {} parameters are up to date", cluster);
            return Ok(false);
        }

        let body = update_body(new, &paths, &suffix);
        let path = cluster_path(cluster);
        tracing::info!("Updating Kafka cluster {}: {}", cluster, paths.join(", "));

        let client = &self.client;
        let (path, body) = (path.as_str(), &body);
        self.run_mutation(ctx, self.config.timeouts.update, move || async move {
            client.patch(path, body).await.map_err(CloudError::from)
        })
        .await?;
        Ok(true)
    }

    /// Move the cluster to `folder` unless it already lives there
    pub async fn move_to_folder(
        &self,
        ctx: &CallContext,
        cluster: &str,
        current_folder: &str,
        folder: &str,
    ) -> Result<bool> {
        if folder.is_empty() || folder == current_folder {
            return Ok(false);
        }

        tracing::info!("Moving Kafka cluster {} to folder {}", cluster, folder);
        let path = format!("{}:move", cluster_path(cluster));
        let body = json!({ "destination_folder_id": folder });

        let client = &self.client;
        let (path, body) = (path.as_str(), &body);
        self.run_mutation(ctx, self.config.timeouts.update, move || async move {
            client.post(path, body).await.map_err(CloudError::from)
        })
        .await?;
        Ok(true)
    }

    async fn run_mutation<F, Fut>(&self, ctx: &CallContext, timeout: Duration, start: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RemoteOperation>>,
    {
        let op_ctx = ctx.child_with_timeout(timeout);
        let mut operation = retry_conflicting_operation(&op_ctx, &self.config.retry, start).await?;
        op_ctx.run(operation.wait(&op_ctx)).await?;
        Ok(())
    }
}

/// Build the update request for `new`, restricted by `paths`
fn update_body(new: &Entity, paths: &[String], suffix: &str) -> Json {
    let mut body = Map::new();
    body.insert("update_mask".into(), json!(paths.join(",")));

    for field in TOP_LEVEL_FIELDS {
        if let Some(value) = new.get(field) {
            body.insert((*field).into(), wire::unwrap_blocks(value.clone().into()));
        }
    }

    if let Some(config) = new.get("config") {
        let mut spec = wire::unwrap_blocks(config.clone().into());
        if let Some(spec) = spec.as_object_mut() {
            if let Some(zones) = spec.remove("zones") {
                spec.insert("zone_id".into(), zones);
            }
            if let Some(kafka) = spec.get_mut("kafka").and_then(Json::as_object_mut) {
                if let Some(settings) = kafka.remove("kafka_config") {
                    kafka.insert(format!("kafka_config_{suffix}"), settings);
                }
            }
        }
        body.insert("config_spec".into(), spec);
    }

    Json::Object(body)
}
