//! Desired-state document
//!
//! ```yaml
//! cluster_id: c9q8ml85r1oh5mbf3bo3
//! kind: kafka
//! version: "3.5"
//! topics:
//!   - name: events
//!     partitions: 6
//!     replication_factor: 3
//!     topic_config:
//!       retention_ms: 86400000
//! users:
//!   - name: producer
//!     password: s3cr3t
//!     permissions:
//!       - topic_name: events
//!         role: ACCESS_ROLE_PRODUCER
//! ```
//!
//! A missing collection is left unmanaged; an empty list removes every
//! entity of that collection.

use anyhow::{Context, Result, bail};
use nimbus_cloud::{Entity, validate_unique_keys};
use nimbus_cloud_mdb::MysqlHosts;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterKind {
    Kafka,
    Mysql,
}

#[derive(Debug, Deserialize)]
pub struct DesiredState {
    pub cluster_id: String,
    pub kind: ClusterKind,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub topics: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub users: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub hosts: Option<Vec<serde_json::Value>>,
}

impl DesiredState {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let state: DesiredState = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<()> {
        if self.cluster_id.trim().is_empty() {
            bail!("cluster_id must not be empty");
        }
        match self.kind {
            ClusterKind::Kafka => {
                if self.hosts.is_some() {
                    bail!("hosts are managed for mysql clusters only");
                }
                if self.topics.is_some() && self.version.is_empty() {
                    bail!("version is required to manage Kafka topics");
                }
            }
            ClusterKind::Mysql => {
                if self.topics.is_some() || self.users.is_some() {
                    bail!("topics and users are managed for kafka clusters only");
                }
            }
        }
        Ok(())
    }
}

/// Decode one collection, keyed by `name`
pub fn entities(items: &Option<Vec<serde_json::Value>>, what: &str) -> Result<Option<Vec<Entity>>> {
    decode(items, what, |_, item| Entity::from_json("name", item))
}

/// Decode MySQL hosts; hosts without `name` are matched by placement
pub fn hosts(items: &Option<Vec<serde_json::Value>>) -> Result<Option<Vec<Entity>>> {
    decode(items, "hosts", |i, item| MysqlHosts::declared_host(i + 1, item))
}

fn decode<F>(
    items: &Option<Vec<serde_json::Value>>,
    what: &str,
    decode_one: F,
) -> Result<Option<Vec<Entity>>>
where
    F: Fn(usize, serde_json::Value) -> nimbus_cloud::Result<Entity>,
{
    let Some(items) = items else {
        return Ok(None);
    };
    let entities = items
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, item)| decode_one(i, item))
        .collect::<nimbus_cloud::Result<Vec<_>>>()
        .with_context(|| format!("Invalid {what}"))?;
    validate_unique_keys(&entities).with_context(|| format!("Invalid {what}"))?;
    Ok(Some(entities))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<DesiredState> {
        let state: DesiredState = serde_yaml::from_str(yaml)?;
        state.validate()?;
        Ok(state)
    }

    #[test]
    fn test_absent_and_empty_collections_differ() {
        let state = parse("cluster_id: c1\nkind: kafka\nversion: '3.5'\nusers: []\n").unwrap();

        assert!(entities(&state.topics, "topics").unwrap().is_none());
        assert_eq!(entities(&state.users, "users").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_topics_are_keyed_by_name() {
        let state = parse(
            "cluster_id: c1\nkind: kafka\nversion: '2.8'\ntopics:\n  - name: t1\n    partitions: 3\n",
        )
        .unwrap();

        let topics = entities(&state.topics, "topics").unwrap().unwrap();
        assert_eq!(topics[0].key, "t1");
        assert_eq!(topics[0].get_i64("partitions"), Some(3));
    }

    #[test]
    fn test_hosts_without_name_get_provisional_keys() {
        let state = parse(
            "cluster_id: m1\nkind: mysql\nhosts:\n  - zone: zone-a\n  - name: b1.mdb\n    zone: zone-b\n  - zone: zone-a\n",
        )
        .unwrap();

        let hosts = hosts(&state.hosts).unwrap().unwrap();
        let keys: Vec<&str> = hosts.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["<new host 1>", "b1.mdb", "<new host 3>"]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let state = parse(
            "cluster_id: c1\nkind: kafka\nversion: '3'\ntopics:\n  - name: t1\n  - name: t1\n",
        )
        .unwrap();
        assert!(entities(&state.topics, "topics").is_err());
    }

    #[test]
    fn test_collections_must_match_kind() {
        assert!(parse("cluster_id: m1\nkind: mysql\ntopics: []\n").is_err());
        assert!(parse("cluster_id: c1\nkind: kafka\nhosts: []\n").is_err());
        assert!(parse("cluster_id: c1\nkind: kafka\ntopics: []\n").is_err());
        assert!(parse("cluster_id: c1\nkind: postgres\n").is_err());
    }
}
