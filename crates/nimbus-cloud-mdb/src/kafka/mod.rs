//! Managed Kafka collections and cluster operations

pub mod cluster;
pub mod host;
pub mod topic;
pub mod user;

pub use cluster::{KAFKA_CLUSTER_FIELDS, KafkaCluster};
pub use host::{KafkaHost, list_kafka_hosts};
pub use topic::{KafkaTopics, normalize_topic};
pub use user::KafkaUsers;

pub(crate) fn cluster_path(cluster: &str) -> String {
    format!("/managed-kafka/v1/clusters/{}", cluster)
}

/// Suffix of version-specific config messages (`kafka_config_2_8`, `topic_config_3`).
///
/// 2.x versions keep their own message with dots replaced by underscores;
/// every later version shares the `3` message.
pub fn kafka_version_suffix(version: &str) -> String {
    if version.starts_with('2') {
        version.replace('.', "_")
    } else {
        "3".to_string()
    }
}
