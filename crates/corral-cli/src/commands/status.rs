//! Status command - one-shot replica group health.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use corral_admin::{AdminTransport, Session};
use corral_bootstrap::poller::sample_group;
use corral_core::{ConvergenceState, GroupConfig, GroupHealth, Topology};
use owo_colors::OwoColorize;

use crate::{Config, OutputFormat};

/// Arguments for the status command.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show this replica group.
    #[arg(long, short = 'g')]
    pub group: Option<String>,
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error if the topology or transport configuration is invalid,
/// or the requested group is not declared.
pub async fn execute(args: &StatusArgs, config: &Config) -> Result<()> {
    let topology = config.load_topology()?;
    let transport = Arc::new(config.transport()?);
    let healths = collect(&topology, transport, args.group.as_deref()).await?;
    render(&healths, config)
}

/// Samples each selected replica group once through its seed.
///
/// Unreachable or uninitiated groups report zero healthy members.
///
/// # Errors
///
/// Returns an error if `group` names an undeclared group.
pub async fn collect(
    topology: &Topology,
    transport: Arc<dyn AdminTransport>,
    group: Option<&str>,
) -> Result<Vec<GroupHealth>> {
    let groups: Vec<&GroupConfig> = match group {
        Some(id) => vec![
            topology
                .replica_group(id)
                .with_context(|| format!("unknown replica group '{id}'"))?,
        ],
        None => topology.replica_groups.iter().collect(),
    };

    let mut healths = Vec::with_capacity(groups.len());
    for group in groups {
        let session = Session::new(group.seed()?.clone(), Arc::clone(&transport));
        healths.push(sample_group(&session, group).await);
    }
    Ok(healths)
}

fn render(healths: &[GroupHealth], config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(healths)?);
        }
        OutputFormat::Text => {
            for health in healths {
                let primary = if health.has_primary { "primary" } else { "no primary" };
                println!(
                    "  {} {}/{} healthy, {} {}",
                    health.group_id,
                    health.healthy,
                    health.declared,
                    primary,
                    format_state_colored(health.state())
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct GroupRow {
                #[tabled(rename = "Group")]
                group: String,
                #[tabled(rename = "Healthy")]
                healthy: String,
                #[tabled(rename = "Primary")]
                primary: bool,
                #[tabled(rename = "State")]
                state: String,
            }

            let rows: Vec<_> = healths
                .iter()
                .map(|h| GroupRow {
                    group: h.group_id.clone(),
                    healthy: format!("{}/{}", h.healthy, h.declared),
                    primary: h.has_primary,
                    state: h.state().to_string(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
    }

    Ok(())
}

fn format_state_colored(state: ConvergenceState) -> String {
    match state {
        ConvergenceState::Converged => state.green().to_string(),
        ConvergenceState::NotConverged => state.yellow().to_string(),
    }
}
