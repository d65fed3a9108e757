//! Topology command - validate and print the effective topology.

use anyhow::Result;
use corral_core::{GroupConfig, Topology};

use crate::{Config, OutputFormat};

const REDACTED: &str = "[REDACTED]";

/// Execute the topology command.
///
/// # Errors
///
/// Returns an error if the topology cannot be loaded or is invalid.
pub fn execute(config: &Config) -> Result<()> {
    let topology = config.load_topology()?;

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&redacted(&topology))?);
        }
        OutputFormat::Text => {
            for line in describe(&topology) {
                println!("{line}");
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct GroupRow {
                #[tabled(rename = "Group")]
                group: String,
                #[tabled(rename = "Kind")]
                kind: &'static str,
                #[tabled(rename = "Seed")]
                seed: String,
                #[tabled(rename = "Members")]
                members: usize,
            }

            let rows: Vec<_> = topology
                .groups()
                .map(|g| GroupRow {
                    group: g.id.clone(),
                    kind: if g.config_server { "config" } else { "replica" },
                    seed: g.seed().map(ToString::to_string).unwrap_or_default(),
                    members: g.member_count(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
    }

    Ok(())
}

/// Returns a copy safe to print, with principal secrets masked.
#[must_use]
pub fn redacted(topology: &Topology) -> Topology {
    let mut shown = topology.clone();
    REDACTED.clone_into(&mut shown.auth.admin.secret);
    REDACTED.clone_into(&mut shown.auth.reader.secret);
    shown
}

/// Human-readable summary lines.
#[must_use]
pub fn describe(topology: &Topology) -> Vec<String> {
    let mut lines = vec![format!("Probe: {}", topology.probe)];

    if !topology.config_groups.is_empty() {
        lines.push(format!(
            "Config groups (initiated on {} and later):",
            topology.config_layer_min_version
        ));
        lines.extend(topology.config_groups.iter().map(describe_group));
    }

    lines.push(format!(
        "Replica groups ({} members to converge):",
        topology.convergence_target()
    ));
    lines.extend(topology.replica_groups.iter().map(describe_group));

    let endpoints: Vec<String> = topology.auth.endpoints.iter().map(ToString::to_string).collect();
    lines.push(format!(
        "Principals: {}, {} on {}",
        topology.auth.admin.name,
        topology.auth.reader.name,
        endpoints.join(", ")
    ));
    if !topology.auth.tls_endpoints.is_empty() {
        let tls: Vec<String> = topology
            .auth
            .tls_endpoints
            .iter()
            .map(ToString::to_string)
            .collect();
        lines.push(format!("  with TLS: {}", tls.join(", ")));
    }

    lines.push("Routers:".to_string());
    for router in &topology.routers {
        let shards: Vec<String> = router.shards.iter().map(ToString::to_string).collect();
        let auth = if router.requires_auth { " (auth)" } else { "" };
        lines.push(format!("  {}{auth} -> {}", router.endpoint, shards.join(", ")));
    }

    lines
}

fn describe_group(group: &GroupConfig) -> String {
    let members: Vec<String> = group
        .members
        .iter()
        .map(|m| format!("{} (p{})", m.host, m.priority))
        .collect();
    format!("  {} {}", group.id, members.join(", "))
}
