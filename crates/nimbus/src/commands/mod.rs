pub mod apply;
pub mod plan;

use crate::desired::{self, ClusterKind, DesiredState};
use anyhow::Result;
use nimbus_cloud::{Entity, Reconcilable};
use nimbus_cloud_mdb::{
    ClientConfig, KafkaTopics, KafkaUsers, MdbClient, MysqlHosts, kafka_version_suffix,
    normalize_topic,
};
use nimbus_config::ProviderConfig;

/// One managed collection of the cluster
pub struct Collection {
    pub resource: Box<dyn Reconcilable>,
    pub desired: Option<Vec<Entity>>,
}

pub fn client(config: &ProviderConfig) -> Result<MdbClient> {
    Ok(MdbClient::new(ClientConfig {
        endpoint: config.endpoint.clone(),
        operation_endpoint: config.operation_endpoint().to_string(),
        token: config.resolve_token()?,
        poll_interval: config.engine.poll_interval,
    }))
}

/// Version tag substituted into update masks
pub fn version_tag(state: &DesiredState) -> String {
    match state.kind {
        ClusterKind::Kafka => kafka_version_suffix(&state.version),
        ClusterKind::Mysql => state.version.clone(),
    }
}

/// Collections of the document, in a fixed order
pub fn collections(state: &DesiredState, client: &MdbClient) -> Result<Vec<Collection>> {
    let collections = match state.kind {
        ClusterKind::Kafka => vec![
            Collection {
                resource: Box::new(KafkaTopics::new(client.clone(), &state.version)),
                desired: desired::entities(&state.topics, "topics")?
                    .map(|topics| topics.into_iter().map(normalize_topic).collect()),
            },
            Collection {
                resource: Box::new(KafkaUsers::new(client.clone())),
                desired: desired::entities(&state.users, "users")?,
            },
        ],
        ClusterKind::Mysql => vec![Collection {
            resource: Box::new(MysqlHosts::new(client.clone())),
            desired: desired::hosts(&state.hosts)?,
        }],
    };
    Ok(collections)
}
