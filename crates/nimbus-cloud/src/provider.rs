//! Reconcilable collection trait definition

use crate::context::CallContext;
use crate::entity::Entity;
use crate::error::Result;
use crate::mask::FieldMask;
use crate::operation::BoxedOperation;
use async_trait::async_trait;

/// A keyed collection of sub-entities under a parent resource.
///
/// Each resource type (Kafka topics, Kafka users, MySQL hosts, ...)
/// implements this trait once; the diff and apply engine is written against
/// it generically.
#[async_trait]
pub trait Reconcilable: Send + Sync {
    /// Resource type name (e.g., "kafka-topic")
    fn resource_type(&self) -> &str;

    /// Update-mask declaration for this entity type
    fn field_mask(&self) -> &FieldMask;

    /// Reject updates the remote API cannot perform in place
    fn check_update(&self, _old: &Entity, _new: &Entity) -> Result<()> {
        Ok(())
    }

    /// Re-key desired entities whose key the API assigns on creation.
    ///
    /// Called after listing and before diffing; a desired entity that
    /// describes an observed one takes the observed key.
    fn match_keys(&self, _desired: &mut [Entity], _observed: &[Entity]) {}

    /// Read the current entities of `parent`
    async fn list_entities(&self, ctx: &CallContext, parent: &str) -> Result<Vec<Entity>>;

    async fn create_entity(
        &self,
        ctx: &CallContext,
        parent: &str,
        spec: &Entity,
    ) -> Result<BoxedOperation>;

    /// Partial update restricted to `changed_paths`
    async fn update_entity(
        &self,
        ctx: &CallContext,
        parent: &str,
        key: &str,
        spec: &Entity,
        changed_paths: &[String],
    ) -> Result<BoxedOperation>;

    async fn delete_entity(
        &self,
        ctx: &CallContext,
        parent: &str,
        key: &str,
    ) -> Result<BoxedOperation>;
}
