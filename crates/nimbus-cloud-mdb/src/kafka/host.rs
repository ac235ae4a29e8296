//! Kafka cluster hosts (read only)

use super::cluster_path;
use crate::client::MdbClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Broker or ZooKeeper host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaHost {
    pub name: String,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub assign_public_ip: bool,
}

/// List every host of `cluster`, sorted by name
pub async fn list_kafka_hosts(client: &MdbClient, cluster: &str) -> Result<Vec<KafkaHost>> {
    let path = format!("{}/hosts", cluster_path(cluster));
    let mut hosts = client
        .list_all(&path, "hosts")
        .await?
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<KafkaHost>, _>>()?;
    hosts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(hosts)
}
