//! Plan and apply engine
//!
//! One reconciliation pass reads the observed collection, diffs it against
//! the desired one and applies the resulting actions one at a time, in key
//! order. Every remote mutation goes through the conflict retry wrapper and
//! is awaited to completion before the next starts. The first failure ends
//! the pass; actions already applied stay applied.

use crate::action::{Action, ActionType, ApplyReport, Plan};
use crate::config::EngineConfig;
use crate::context::CallContext;
use crate::diff::{compute_diffs, fill_write_only};
use crate::entity::{Entity, validate_unique_keys};
use crate::error::Result;
use crate::operation::BoxedOperation;
use crate::provider::Reconcilable;
use crate::retry::retry_conflicting_operation;
use std::time::Instant;

/// Per-pass options
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions<'a> {
    /// Version tag substituted into `{version}` mask paths
    pub version: &'a str,

    /// Desired state applied by the previous pass, for write-only attributes
    pub last_applied: Option<&'a [Entity]>,

    /// Plan only, never mutate
    pub dry_run: bool,
}

/// Diff/apply engine bound to an explicit configuration
pub struct Reconciler<'a> {
    config: &'a EngineConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Compute the actions needed to converge `parent` to `desired`.
    ///
    /// `None` means the collection is not managed: the plan is empty and the
    /// remote API is not queried.
    pub async fn plan(
        &self,
        resource: &dyn Reconcilable,
        ctx: &CallContext,
        parent: &str,
        desired: Option<&[Entity]>,
        opts: ReconcileOptions<'_>,
    ) -> Result<Plan> {
        let resource_type = resource.resource_type();
        let Some(desired) = desired else {
            tracing::debug!("{} collection of {} is not managed", resource_type, parent);
            return Ok(Plan::empty(resource_type, parent));
        };

        validate_unique_keys(desired)?;

        let read_ctx = ctx.child_with_timeout(self.config.timeouts.read);
        let mut observed = read_ctx
            .run(resource.list_entities(&read_ctx, parent))
            .await?;

        let mut desired = desired.to_vec();
        resource.match_keys(&mut desired, &observed);
        fill_write_only(&mut observed, &desired, opts.last_applied, resource.field_mask());

        let diffs = compute_diffs(&desired, &observed, resource.field_mask(), opts.version);
        // Immutable attributes are outside the mask, so check every pair that differs
        for diff in &diffs {
            if let (Some(old), Some(new)) = (&diff.old, &diff.new) {
                if old.attributes != new.attributes {
                    resource.check_update(old, new)?;
                }
            }
        }

        let plan = Plan::new(
            resource_type,
            parent,
            diffs.into_iter().map(Action::from_diff).collect(),
        );
        tracing::info!("{} plan for {}: {}", resource_type, parent, plan.summary());
        Ok(plan)
    }

    /// Apply a plan sequentially, stopping at the first error
    pub async fn apply(
        &self,
        resource: &dyn Reconcilable,
        ctx: &CallContext,
        plan: &Plan,
    ) -> Result<ApplyReport> {
        let started = Instant::now();
        let mut report = ApplyReport::new();

        let mut actions: Vec<&Action> = plan.actions.iter().collect();
        actions.sort_by(|a, b| a.key().cmp(b.key()));

        for action in actions {
            let action_type = action.action_type();
            if action_type == ActionType::NoOp {
                tracing::debug!("{} {} is up to date", plan.resource_type, action.key());
                continue;
            }

            tracing::info!("{} {}: {}", plan.resource_type, plan.parent, action.describe());
            let message = self
                .apply_action(resource, ctx, &plan.parent, action)
                .await
                .map_err(|e| {
                    e.in_action(
                        action_type,
                        plan.resource_type.clone(),
                        plan.parent.clone(),
                        action.key(),
                    )
                })?;
            tracing::info!("{} {}: {}", plan.resource_type, action.key(), message);
            report.add(action_type, action.key(), message);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Plan then apply, unless `opts.dry_run`
    pub async fn reconcile(
        &self,
        resource: &dyn Reconcilable,
        ctx: &CallContext,
        parent: &str,
        desired: Option<&[Entity]>,
        opts: ReconcileOptions<'_>,
    ) -> Result<(Plan, ApplyReport)> {
        let plan = self.plan(resource, ctx, parent, desired, opts).await?;
        if opts.dry_run || !plan.has_changes {
            return Ok((plan, ApplyReport::new()));
        }
        let report = self.apply(resource, ctx, &plan).await?;
        Ok((plan, report))
    }

    async fn apply_action(
        &self,
        resource: &dyn Reconcilable,
        ctx: &CallContext,
        parent: &str,
        action: &Action,
    ) -> Result<String> {
        let timeouts = &self.config.timeouts;
        match action {
            Action::Create { entity } => {
                let op_ctx = ctx.child_with_timeout(timeouts.create);
                let op_ctx = &op_ctx;
                self.run_operation(op_ctx, move || {
                    resource.create_entity(op_ctx, parent, entity)
                })
                .await?;
                Ok("created".to_string())
            }
            Action::Update {
                entity,
                changed_paths,
            } => {
                // An empty mask would be a meaningless API call
                if changed_paths.is_empty() {
                    return Ok("nothing to update".to_string());
                }
                let op_ctx = ctx.child_with_timeout(timeouts.update);
                let op_ctx = &op_ctx;
                let key = entity.key.as_str();
                self.run_operation(op_ctx, move || {
                    resource.update_entity(op_ctx, parent, key, entity, changed_paths)
                })
                .await?;
                Ok(format!("updated {}", changed_paths.join(", ")))
            }
            Action::Delete { key } => {
                let op_ctx = ctx.child_with_timeout(timeouts.delete);
                let op_ctx = &op_ctx;
                let key = key.as_str();
                match self
                    .run_operation(op_ctx, move || resource.delete_entity(op_ctx, parent, key))
                    .await
                {
                    Ok(()) => Ok("deleted".to_string()),
                    Err(e) if e.is_not_found() && self.config.ignore_missing_on_delete => {
                        tracing::warn!("{} {} was already gone: {}", resource.resource_type(), key, e);
                        Ok("already absent".to_string())
                    }
                    Err(e) => Err(e),
                }
            }
            Action::NoOp { .. } => Ok("unchanged".to_string()),
        }
    }

    /// Start an operation with conflict retry and wait for it to finish
    async fn run_operation<F, Fut>(&self, ctx: &CallContext, start: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<BoxedOperation>>,
    {
        let mut operation = retry_conflicting_operation(ctx, &self.config.retry, start).await?;
        let id = operation.id().to_string();
        tracing::debug!("Waiting for operation {}", id);

        if let Err(e) = ctx.run(operation.wait(ctx)).await {
            if e.is_timeout() {
                tracing::warn!("Stopped waiting for operation {}: {}", id, e);
            }
            return Err(e);
        }
        Ok(())
    }
}

