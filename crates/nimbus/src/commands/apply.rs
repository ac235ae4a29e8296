use super::plan::print_plan;
use super::{Collection, client, collections, version_tag};
use crate::desired::{ClusterKind, DesiredState};
use anyhow::{Context, Result};
use colored::Colorize;
use nimbus_cloud::{CallContext, ReconcileOptions, Reconciler, StateManager};
use nimbus_cloud_mdb::KafkaCluster;
use nimbus_config::ProviderConfig;

pub async fn handle_apply(
    state: &DesiredState,
    config: &ProviderConfig,
    manager: &StateManager,
    ctx: &CallContext,
    dry_run: bool,
) -> Result<()> {
    let client = client(config)?;
    let reconciler = Reconciler::new(&config.engine);
    let version = version_tag(state);
    let mut applied = manager.load().await?;

    if let (ClusterKind::Kafka, Some(folder), false) = (state.kind, &config.folder_id, dry_run) {
        let cluster = KafkaCluster::new(client.clone(), config.engine.clone());
        let current = cluster.get(ctx, &state.cluster_id).await?;
        let current_folder = current.get_str("folder_id").unwrap_or_default();
        if cluster
            .move_to_folder(ctx, &state.cluster_id, current_folder, folder)
            .await?
        {
            println!("{} moved to folder {}", state.cluster_id.bold(), folder.cyan());
        }
    }

    for Collection { resource, desired } in collections(state, &client)? {
        let resource_type = resource.resource_type().to_string();
        let opts = ReconcileOptions {
            version: &version,
            last_applied: applied.get(&resource_type, &state.cluster_id),
            dry_run,
        };
        let (plan, report) = reconciler
            .reconcile(
                resource.as_ref(),
                ctx,
                &state.cluster_id,
                desired.as_deref(),
                opts,
            )
            .await
            .with_context(|| format!("Failed to reconcile {resource_type}"))?;

        print_plan(&plan, desired.is_some());
        if dry_run {
            continue;
        }
        for result in &report.applied {
            println!(
                "  {} {} {}",
                "✓".green(),
                result.key,
                result.message.dimmed()
            );
        }

        if let Some(desired) = desired {
            applied.record(&resource_type, &state.cluster_id, desired);
            manager.save(&applied).await?;
        }
    }

    if dry_run {
        println!("{}", "Dry run: no changes were made".yellow());
    }
    Ok(())
}
