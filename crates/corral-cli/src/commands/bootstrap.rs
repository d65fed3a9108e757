//! Bootstrap command - drive the topology to a converged cluster.

use std::sync::Arc;

use anyhow::{Context, Result};
use corral_bootstrap::{BootstrapReport, Bootstrapper, CreateOutcome};
use corral_core::{BootstrapPolicy, TokioClock};
use owo_colors::OwoColorize;
use tabled::Tabled;

use crate::{Config, OutputFormat};

/// Execute the bootstrap command.
///
/// # Errors
///
/// Returns the bootstrap failure, or an error if the topology, transport, or
/// timing configuration is invalid.
pub async fn execute(config: &Config) -> Result<()> {
    let topology = config.load_topology()?;
    let policy = BootstrapPolicy::from_env().context("invalid timing configuration")?;
    let transport = Arc::new(config.transport()?);

    let report = Bootstrapper::new(topology, transport, Arc::new(TokioClock), policy)
        .run()
        .await?;

    render(&report, config)
}

fn render(report: &BootstrapReport, config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            for line in summary(report) {
                println!("{line}");
            }
        }
        OutputFormat::Table => {
            println!("{}", tabled::Table::new(credential_rows(report)));
            println!("{}", tabled::Table::new(shard_rows(report)));
        }
    }
    Ok(())
}

/// One provisioned endpoint.
#[derive(Debug, Tabled)]
pub struct CredentialRow {
    /// Endpoint.
    #[tabled(rename = "Endpoint")]
    pub endpoint: String,
    /// Admin principal outcome.
    #[tabled(rename = "Admin")]
    pub admin: String,
    /// Whether authentication succeeded.
    #[tabled(rename = "Authenticated")]
    pub authenticated: bool,
    /// Read-only principal outcome.
    #[tabled(rename = "Reader")]
    pub reader: String,
}

/// One shard registration.
#[derive(Debug, Tabled)]
pub struct ShardRow {
    /// Router endpoint.
    #[tabled(rename = "Router")]
    pub router: String,
    /// Shard reference.
    #[tabled(rename = "Shard")]
    pub shard: String,
    /// Registration status.
    #[tabled(rename = "Status")]
    pub status: String,
    /// Attempts made.
    #[tabled(rename = "Attempts")]
    pub attempts: u32,
}

/// Rows for the credential table.
#[must_use]
pub fn credential_rows(report: &BootstrapReport) -> Vec<CredentialRow> {
    report
        .provisioning
        .endpoints
        .iter()
        .map(|e| CredentialRow {
            endpoint: e.endpoint.to_string(),
            admin: outcome_label(&e.admin).to_string(),
            authenticated: e.authenticated,
            reader: outcome_label(&e.reader).to_string(),
        })
        .collect()
}

/// Rows for the shard table.
#[must_use]
pub fn shard_rows(report: &BootstrapReport) -> Vec<ShardRow> {
    report
        .registration
        .outcomes
        .iter()
        .map(|o| ShardRow {
            router: o.router.to_string(),
            shard: o.shard.to_string(),
            status: if o.registered { "registered" } else { "failed" }.to_string(),
            attempts: o.attempts,
        })
        .collect()
}

fn summary(report: &BootstrapReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Server version {} (TLS {})",
            report.capabilities.version,
            if report.capabilities.tls_enabled { "on" } else { "off" }
        ),
        format!(
            "Converged: {}/{} healthy at tick {}",
            report.convergence.healthy, report.convergence.target, report.convergence.tick
        ),
    ];

    for endpoint in &report.provisioning.endpoints {
        let ok =
            endpoint.admin.is_success() && endpoint.authenticated && endpoint.reader.is_success();
        let mark = if ok {
            "ok".green().to_string()
        } else {
            "incomplete".yellow().to_string()
        };
        lines.push(format!(
            "  credentials {} {mark} (admin {}, reader {})",
            endpoint.endpoint,
            outcome_label(&endpoint.admin),
            outcome_label(&endpoint.reader)
        ));
    }

    for outcome in &report.registration.outcomes {
        let mark = if outcome.registered {
            "registered".green().to_string()
        } else {
            "failed".red().to_string()
        };
        lines.push(format!("  shard {} on {} {mark}", outcome.shard, outcome.router));
        if let Some(error) = &outcome.last_error {
            lines.push(format!("    Error: {}", error.red()));
        }
    }

    lines
}

fn outcome_label(outcome: &CreateOutcome) -> &'static str {
    match outcome {
        CreateOutcome::Created => "created",
        CreateOutcome::AlreadyExists => "existing",
        CreateOutcome::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use corral_core::Endpoint;
    use corral_test_utils::simulation::failure;
    use corral_test_utils::{SimulatedCluster, fixtures};

    use super::*;

    async fn report(cluster: &Arc<SimulatedCluster>) -> BootstrapReport {
        Bootstrapper::new(
            fixtures::single_group_topology(),
            cluster.clone(),
            cluster.clock(),
            fixtures::policy(),
        )
        .run()
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_rows_reflect_report() {
        let cluster = SimulatedCluster::new().shared();
        let report = report(&cluster).await;

        let credentials = credential_rows(&report);
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials[0].admin, "created");
        assert!(credentials[0].authenticated);

        let shards = shard_rows(&report);
        assert_eq!(shards[0].shard, "rs1/127.0.0.1:40011");
        assert_eq!(shards[0].status, "registered");
    }

    #[tokio::test]
    async fn test_summary_surfaces_shard_errors() {
        let cluster = SimulatedCluster::new()
            .always(
                &Endpoint::loopback(40201),
                "addShard",
                failure(96, "OperationFailed", "host unreachable"),
            )
            .shared();
        let report = report(&cluster).await;

        let lines = summary(&report);
        assert!(lines[1].starts_with("Converged: 3/3"));
        assert!(lines.iter().any(|l| l.contains("host unreachable")));
        assert_eq!(shard_rows(&report)[0].attempts, 10);
    }
}
