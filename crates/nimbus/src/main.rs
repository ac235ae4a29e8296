mod commands;
mod desired;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use desired::DesiredState;
use nimbus_cloud::{CallContext, StateManager};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nimbus")]
#[command(about = "Keep managed cluster topics, users and hosts in sync with their declaration", long_about = None)]
struct Cli {
    /// Provider configuration file (default: discovered)
    #[arg(long, global = true, env = "NIMBUS_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the changes needed to reach the declared state
    Plan {
        /// Desired-state document (YAML)
        file: PathBuf,
    },
    /// Apply the declared state
    Apply {
        /// Desired-state document (YAML)
        file: PathBuf,

        /// Compute the plan without changing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_provider_config(path: Option<&Path>) -> anyhow::Result<nimbus_config::ProviderConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => nimbus_config::find_config_file()?,
    };
    tracing::debug!("Using configuration {}", path.display());
    nimbus_config::load_config(&path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}

/// Directory holding `.nimbus/state.json`, next to the document
fn project_root(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Cancel in-flight calls on Ctrl-C
fn cancel_on_interrupt(ctx: &CallContext) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, cancelling...".yellow());
            ctx.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // version needs no configuration
    if matches!(cli.command, Commands::Version) {
        println!("nimbus {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = CallContext::background();
    cancel_on_interrupt(&ctx);

    match &cli.command {
        Commands::Plan { file } => {
            let state = DesiredState::load(file)?;
            let config = load_provider_config(cli.config.as_deref())?;
            let applied = StateManager::new(project_root(file)).load().await?;
            commands::plan::handle_plan(&state, &config, &applied, &ctx).await?;
        }
        Commands::Apply { file, dry_run } => {
            let state = DesiredState::load(file)?;
            let config = load_provider_config(cli.config.as_deref())?;
            let manager = StateManager::new(project_root(file));
            commands::apply::handle_apply(&state, &config, &manager, &ctx, *dry_run).await?;
        }
        Commands::Version => {}
    }

    Ok(())
}
