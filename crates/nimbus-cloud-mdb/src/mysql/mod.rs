//! Managed MySQL collections

pub mod host;

pub use host::{MysqlHosts, is_new_host_key, new_host_key};

pub(crate) fn cluster_path(cluster: &str) -> String {
    format!("/managed-mysql/v1/clusters/{}", cluster)
}
