/// # solution-deployer CLI Interface (Module)
///
/// Command parsing and orchestration for the `solution-deployer` binary.
///
/// All templating, deployment and deletion logic lives in
/// [`solution-deployer-core`]; this module loads the config, builds the
/// HTTP-backed portal client and hands both to the core pipelines.
///
/// ## How To Use
/// - For command-line users: use the installed `solution-deployer` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// ## Extending
/// When adding subcommands, update [`Commands`] below and keep the logic itself
/// inside `solution-deployer-core`.
///
/// [`solution-deployer-core`]: ../../solution-deployer-core/
use crate::hub::HubSiteRemover;
use crate::load_config::{load_config, CliConfig};
use crate::portal_client::ArcGisPortal;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use solution_deployer_core::build_order::reconstruct_build_order_ids;
use solution_deployer_core::contract::Portal;
use solution_deployer_core::delete::{delete_solution, get_deletable_solution_info};
use solution_deployer_core::model::ItemTemplate;
use solution_deployer_core::progress::DeleteOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CLI for solution-deployer: inspect and delete deployed Solutions.
#[derive(Parser)]
#[clap(
    name = "solution-deployer",
    version,
    about = "Inspect, order and delete deployed platform Solutions"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Delete a deployed Solution and the items it deployed
    Delete {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Id of the deployed Solution item
        #[clap(long)]
        solution_id: String,
    },
    /// Show what deleting a deployed Solution would remove
    Summary {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        solution_id: String,
    },
    /// Print the creation order of a JSON array of templates
    BuildOrder {
        /// Path to a JSON file holding an array of item templates
        #[clap(long)]
        templates: PathBuf,
        /// Print the deletion order instead
        #[clap(long)]
        reverse: bool,
    },
}

fn delete_options(config: &CliConfig) -> DeleteOptions {
    DeleteOptions {
        job_id: Some(config.job_id.clone()),
        console_progress: config.console_progress,
        ..DeleteOptions::default()
    }
}

fn read_templates(path: &Path) -> Result<Vec<ItemTemplate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read templates file {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse templates JSON {path:?}"))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Delete {
            config,
            solution_id,
        } => {
            let config = load_config(config)?;
            tracing::info!(command = "delete", solution_id = %solution_id, "Starting Solution deletion");
            let portal: Arc<dyn Portal> = Arc::new(ArcGisPortal::from_config(&config));
            let site_remover = HubSiteRemover::new(portal.clone(), config.hub_api_url.clone());

            match delete_solution(&solution_id, portal.as_ref(), &site_remover, &delete_options(&config)).await {
                Ok((deleted, failed)) => {
                    tracing::info!(
                        command = "delete",
                        deleted = deleted.items.len(),
                        failed = failed.items.len(),
                        "Deletion complete"
                    );
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "deleted": deleted, "failed": failed }))?
                    );
                    if failed.is_empty() {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!(
                            "{} item(s) and {} group(s) of Solution {solution_id} could not be deleted",
                            failed.items.len(),
                            failed.groups.len()
                        ))
                    }
                }
                Err(e) => {
                    tracing::error!(command = "delete", error = %e, "Deletion failed");
                    Err(anyhow::Error::new(e).context(format!("Deleting Solution {solution_id}")))
                }
            }
        }
        Commands::Summary {
            config,
            solution_id,
        } => {
            let config = load_config(config)?;
            let portal = ArcGisPortal::from_config(&config);
            let summary = get_deletable_solution_info(&solution_id, &portal)
                .await
                .with_context(|| format!("Summarising Solution {solution_id}"))?;
            tracing::info!(command = "summary", items = summary.items.len(), groups = summary.groups.len(), "Summary complete");
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::BuildOrder { templates, reverse } => {
            let templates = read_templates(&templates)?;
            let mut order = reconstruct_build_order_ids(&templates)
                .context("Templates cannot be ordered")?;
            if reverse {
                order.reverse();
            }
            tracing::info!(command = "build-order", templates = templates.len(), "Build order computed");
            for id in order {
                println!("{id}");
            }
            Ok(())
        }
    }
}
