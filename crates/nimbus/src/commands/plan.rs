use super::{Collection, client, collections, version_tag};
use crate::desired::DesiredState;
use anyhow::Result;
use colored::Colorize;
use nimbus_cloud::{Action, AppliedState, CallContext, Plan, ReconcileOptions, Reconciler};
use nimbus_config::ProviderConfig;

/// Print one collection's plan; `managed` is false for an undeclared collection
pub fn print_plan(plan: &Plan, managed: bool) {
    println!(
        "{} {}",
        plan.resource_type.bold(),
        format!("({})", plan.parent).dimmed()
    );
    if !managed {
        println!("  {}", "not managed".dimmed());
        return;
    }

    for action in &plan.actions {
        match action {
            Action::Create { entity } => {
                println!("  {} {}", "+".green(), entity.key.green());
            }
            Action::Update {
                entity,
                changed_paths,
            } => {
                println!(
                    "  {} {} {}",
                    "~".yellow(),
                    entity.key.yellow(),
                    changed_paths.join(", ").dimmed()
                );
            }
            Action::Delete { key } => {
                println!("  {} {}", "-".red(), key.red());
            }
            Action::NoOp { key } => {
                tracing::debug!("{} {} unchanged", plan.resource_type, key);
            }
        }
    }
    println!("  {}", plan.summary().to_string().cyan());
}

pub async fn handle_plan(
    state: &DesiredState,
    config: &ProviderConfig,
    applied: &AppliedState,
    ctx: &CallContext,
) -> Result<()> {
    let client = client(config)?;
    let reconciler = Reconciler::new(&config.engine);
    let version = version_tag(state);

    for Collection { resource, desired } in collections(state, &client)? {
        let opts = ReconcileOptions {
            version: &version,
            last_applied: applied.get(resource.resource_type(), &state.cluster_id),
            dry_run: true,
        };
        let plan = reconciler
            .plan(
                resource.as_ref(),
                ctx,
                &state.cluster_id,
                desired.as_deref(),
                opts,
            )
            .await?;
        print_plan(&plan, desired.is_some());
    }
    Ok(())
}
