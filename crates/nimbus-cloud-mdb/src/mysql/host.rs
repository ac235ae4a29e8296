//! MySQL cluster hosts

use super::cluster_path;
use crate::client::MdbClient;
use async_trait::async_trait;
use nimbus_cloud::value::same_value;
use nimbus_cloud::{
    BoxedOperation, CallContext, CloudError, Entity, FieldMask, Reconcilable, Result, Value,
};
use serde_json::{Map, Value as Json, json};

/// Attributes fixed at host creation
const IMMUTABLE: &[&str] = &["zone", "subnet_id"];

/// Attributes kept from the API host resource
const HOST_FIELDS: &[&str] = &["name", "zone", "subnet_id", "assign_public_ip", "replication_source"];

/// Key prefix of declared hosts whose FQDN is not known yet
const NEW_HOST_PREFIX: &str = "<new host ";

/// Provisional key of the `index`-th (1-based) declared host without a name
pub fn new_host_key(index: usize) -> String {
    format!("{NEW_HOST_PREFIX}{index}>")
}

pub fn is_new_host_key(key: &str) -> bool {
    key.starts_with(NEW_HOST_PREFIX)
}

/// Undeclared optional attributes match any reported value
fn optional_matches(declared: &Entity, reported: &Entity, attribute: &str) -> bool {
    match declared.get(attribute) {
        None | Some(Value::Null) => true,
        value => same_value(value, reported.get(attribute)),
    }
}

/// Same placement: zone and, when declared, subnet
fn partially_matches(declared: &Entity, reported: &Entity) -> bool {
    same_value(declared.get("zone"), reported.get("zone"))
        && optional_matches(declared, reported, "subnet_id")
}

/// Same placement and nothing to update
fn fully_matches(declared: &Entity, reported: &Entity) -> bool {
    partially_matches(declared, reported)
        && optional_matches(declared, reported, "assign_public_ip")
        && optional_matches(declared, reported, "replication_source")
}

/// Host collection, keyed by host FQDN
pub struct MysqlHosts {
    client: MdbClient,
    mask: FieldMask,
}

impl MysqlHosts {
    pub fn new(client: MdbClient) -> Self {
        Self {
            client,
            mask: Self::update_mask(),
        }
    }

    pub fn update_mask() -> FieldMask {
        FieldMask::new()
            .leaf("assign_public_ip", "assign_public_ip")
            .leaf("replication_source", "replication_source")
            .computed("assign_public_ip")
            .computed("replication_source")
    }

    /// Decode the `index`-th (1-based) declared host.
    ///
    /// A host without `name` gets a provisional key until it is matched to
    /// a reported host or created.
    pub fn declared_host(index: usize, item: Json) -> Result<Entity> {
        let Json::Object(object) = item else {
            return Entity::from_json("name", item);
        };
        if object.contains_key("name") {
            return Entity::from_json("name", Json::Object(object));
        }
        let mut host = Entity::new(new_host_key(index));
        for (attribute, value) in object {
            host.set(attribute, Value::from(value));
        }
        Ok(host)
    }

    fn hosts_path(parent: &str, action: &str) -> String {
        format!("{}/hosts{}", cluster_path(parent), action)
    }

    fn decode(item: Json) -> Result<Entity> {
        let Json::Object(mut object) = item else {
            return Entity::from_json("name", item);
        };
        if let Some(zone) = object.remove("zone_id") {
            object.insert("zone".into(), zone);
        }
        object.retain(|k, _| HOST_FIELDS.contains(&k.as_str()));
        Entity::from_json("name", Json::Object(object))
    }

    fn host_spec(spec: &Entity) -> Json {
        let mut host = Map::new();
        if let Some(zone) = spec.get("zone") {
            host.insert("zone_id".into(), zone.clone().into());
        }
        for field in ["subnet_id", "assign_public_ip", "replication_source"] {
            if let Some(value) = spec.get(field) {
                host.insert(field.into(), value.clone().into());
            }
        }
        Json::Object(host)
    }
}

#[async_trait]
impl Reconcilable for MysqlHosts {
    fn resource_type(&self) -> &str {
        "mysql-host"
    }

    fn field_mask(&self) -> &FieldMask {
        &self.mask
    }

    /// Zone and subnet can only change by replacing the host
    fn check_update(&self, old: &Entity, new: &Entity) -> Result<()> {
        for attribute in IMMUTABLE {
            // An undeclared subnet is chosen by the API
            if *attribute == "subnet_id" && new.get(attribute).is_none() {
                continue;
            }
            if !same_value(old.get(attribute), new.get(attribute)) {
                return Err(CloudError::Validation(format!(
                    "host {}: attributes zone, subnet_id can't be changed, replace the host instead",
                    new.key
                )));
            }
        }
        Ok(())
    }

    /// Give unnamed hosts the FQDN of a reported host in the same place,
    /// preferring one that needs no update
    fn match_keys(&self, desired: &mut [Entity], observed: &[Entity]) {
        let mut unclaimed: Vec<&Entity> = observed
            .iter()
            .filter(|o| !desired.iter().any(|d| d.key == o.key))
            .collect();

        let rules: [fn(&Entity, &Entity) -> bool; 2] = [fully_matches, partially_matches];
        for matches in rules {
            for host in desired.iter_mut().filter(|h| is_new_host_key(&h.key)) {
                let Some(pos) = unclaimed.iter().position(|o| matches(&*host, *o)) else {
                    continue;
                };
                let reported = unclaimed.remove(pos);
                tracing::debug!("Declared host {} is {}", host.key, reported.key);
                host.key = reported.key.clone();
                host.set("name", reported.key.clone());
            }
        }
    }

    async fn list_entities(&self, _ctx: &CallContext, parent: &str) -> Result<Vec<Entity>> {
        let items = self
            .client
            .list_all(&Self::hosts_path(parent, ""), "hosts")
            .await?;
        items.into_iter().map(Self::decode).collect()
    }

    async fn create_entity(
        &self,
        _ctx: &CallContext,
        parent: &str,
        spec: &Entity,
    ) -> Result<BoxedOperation> {
        let body = json!({ "host_specs": [Self::host_spec(spec)] });
        tracing::debug!("Adding MySQL host {} to {}: {}", spec.key, parent, body);
        let operation = self
            .client
            .post(&Self::hosts_path(parent, ":batchCreate"), &body)
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
        let mut host = Map::new();
        host.insert("host_name".into(), json!(key));
        host.insert("update_mask".into(), json!(changed_paths.join(",")));
        for field in ["assign_public_ip", "replication_source"] {
            if let Some(value) = spec.get(field) {
                host.insert(field.into(), value.clone().into());
            }
        }
        let body = json!({ "update_host_specs": [host] });
        tracing::debug!("Updating MySQL host {} in {}: {}", key, parent, body);
        let operation = self
            .client
            .post(&Self::hosts_path(parent, ":batchUpdate"), &body)
            .await?;
        Ok(Box::new(operation))
    }

    async fn delete_entity(
        &self,
        _ctx: &CallContext,
        parent: &str,
        key: &str,
    ) -> Result<BoxedOperation> {
        let body = json!({ "host_names": [key] });
        let operation = self
            .client
            .post(&Self::hosts_path(parent, ":batchDelete"), &body)
            .await?;
        Ok(Box::new(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use std::time::Duration;

    fn hosts() -> MysqlHosts {
        MysqlHosts::new(MdbClient::new(ClientConfig {
            endpoint: "http://localhost".into(),
            operation_endpoint: "http://localhost".into(),
            token: "t".into(),
            poll_interval: Duration::from_millis(10),
        }))
    }

    fn host(zone: &str) -> Entity {
        Entity::new("db1.mdb.local")
            .with("zone", zone)
            .with("subnet_id", "s1")
            .with("assign_public_ip", false)
    }

    #[test]
    fn test_zone_change_is_rejected() {
        let err = hosts()
            .check_update(&host("zone-a"), &host("zone-b"))
            .unwrap_err();
        assert!(matches!(err, CloudError::Validation(_)));
    }

    #[test]
    fn test_mutable_change_is_accepted() {
        let old = host("zone-a");
        let new = host("zone-a").with("assign_public_ip", true);
        hosts().check_update(&old, &new).unwrap();

        let paths = MysqlHosts::update_mask().changed_paths(&old, &new, "");
        assert_eq!(paths, vec!["assign_public_ip"]);
    }

    #[test]
    fn test_undeclared_subnet_is_not_a_change() {
        let old = host("zone-a");
        let mut new = host("zone-a");
        new.attributes.remove("subnet_id");
        hosts().check_update(&old, &new).unwrap();
    }

    fn reported(name: &str, zone: &str, subnet: &str) -> Entity {
        Entity::new(name)
            .with("name", name)
            .with("zone", zone)
            .with("subnet_id", subnet)
            .with("assign_public_ip", false)
    }

    fn unnamed(index: usize, zone: &str) -> Entity {
        MysqlHosts::declared_host(index, json!({ "zone": zone, "assign_public_ip": false }))
            .unwrap()
    }

    #[test]
    fn test_declared_host_without_name_gets_provisional_key() {
        let host = unnamed(2, "zone-a");
        assert_eq!(host.key, new_host_key(2));
        assert!(is_new_host_key(&host.key));
        assert!(host.get("name").is_none());

        let named = MysqlHosts::declared_host(1, json!({ "name": "db1.mdb", "zone": "zone-a" }))
            .unwrap();
        assert_eq!(named.key, "db1.mdb");
    }

    #[test]
    fn test_unnamed_hosts_take_reported_keys() {
        let observed = vec![
            reported("a1.mdb", "zone-a", "s-a").with("assign_public_ip", true),
            reported("a2.mdb", "zone-a", "s-a"),
            reported("b1.mdb", "zone-b", "s-b"),
        ];
        let mut desired = vec![
            unnamed(1, "zone-a"),
            unnamed(2, "zone-a"),
            unnamed(3, "zone-c"),
            reported("b1.mdb", "zone-b", "s-b"),
        ];

        hosts().match_keys(&mut desired, &observed);

        let keys: Vec<&str> = desired.iter().map(|h| h.key.as_str()).collect();
        // exact matches are claimed before placement-only ones
        assert_eq!(keys, vec!["a2.mdb", "a1.mdb", "<new host 3>", "b1.mdb"]);
        assert_eq!(desired[0].get_str("name"), Some("a2.mdb"));
    }

    #[test]
    fn test_undeclared_replication_source_is_not_a_change() {
        let old = host("zone-a").with("replication_source", "db0.mdb.local");
        let new = host("zone-a");
        assert!(MysqlHosts::update_mask().changed_paths(&old, &new, "").is_empty());
    }

    #[test]
    fn test_decode_keeps_host_fields() {
        let host = MysqlHosts::decode(json!({
            "name": "db1.mdb.local",
            "cluster_id": "c1",
            "zone_id": "zone-a",
            "role": "MASTER",
            "assign_public_ip": true
        }))
        .unwrap();

        assert_eq!(host.get_str("zone"), Some("zone-a"));
        assert_eq!(host.get_bool("assign_public_ip"), Some(true));
        assert!(host.get("role").is_none());
    }
}
