//! Managed database provider for Nimbus
//!
//! Implements [`nimbus_cloud::Reconcilable`] for the nested collections of
//! managed Kafka and MySQL clusters over the control-plane REST API.
//!
//! ## Collections
//!
//! - [`KafkaTopics`] / [`KafkaUsers`]: per-cluster topics and users
//! - [`MysqlHosts`]: per-cluster hosts
//!
//! Cluster-wide parameter updates and folder moves live on [`KafkaCluster`].

pub mod client;
pub mod error;
pub mod kafka;
pub mod mysql;
pub mod operation;
mod wire;

pub use client::{ClientConfig, DEFAULT_PAGE_SIZE, MdbClient};
pub use error::{MdbError, Result};
pub use kafka::{
    KafkaCluster, KafkaHost, KafkaTopics, KafkaUsers, kafka_version_suffix, list_kafka_hosts,
    normalize_topic,
};
pub use mysql::{MysqlHosts, is_new_host_key, new_host_key};
pub use operation::RemoteOperation;
