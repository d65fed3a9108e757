//! # corral-cli
//!
//! Command-line interface for corral cluster bootstrap.
//!
//! ## Commands
//!
//! - `corral bootstrap` - Bring the topology up to a converged, sharded cluster
//! - `corral status` - One-shot health snapshot of every replica group
//! - `corral topology` - Validate and print the effective topology
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `CORRAL_TOPOLOGY` - Topology JSON file (default: built-in local cluster)
//! - `CORRAL_SCHEME` - Transport scheme, `http` or `https`
//! - `CORRAL_REQUEST_TIMEOUT_SECS` - Per-command timeout
//! - `CORRAL_LOG_FORMAT` - `pretty` or `json`
//!
//! Retry timing is read from `CORRAL_*` variables by
//! [`corral_core::BootstrapPolicy::from_env`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use corral_admin::{HttpTransport, TransportConfig};
use corral_bootstrap::error::{EXIT_CONFIGURATION, EXIT_SUCCESS};
use corral_core::{LogFormat, Topology};

/// Exit status for failures without a dedicated code.
pub const EXIT_FAILURE: i32 = 1;

/// Corral CLI - cluster bootstrap orchestrator.
#[derive(Debug, Parser)]
#[command(name = "corral")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Topology JSON file; the built-in local cluster when absent.
    #[arg(long, env = "CORRAL_TOPOLOGY")]
    pub topology: Option<PathBuf>,

    /// Transport scheme.
    #[arg(long, env = "CORRAL_SCHEME", default_value = "http")]
    pub scheme: String,

    /// Per-command request timeout in seconds.
    #[arg(long, env = "CORRAL_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Log output format.
    #[arg(long, env = "CORRAL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            topology: self.topology.clone(),
            transport: TransportConfig {
                scheme: self.scheme.clone(),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            log_format: self.log_format.into(),
            format: self.format.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initiate, converge, provision, and register the topology.
    Bootstrap,
    /// Show replica group health.
    Status(commands::status::StatusArgs),
    /// Validate and print the effective topology.
    Topology,
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// Log format flag.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable logs.
    #[default]
    Pretty,
    /// JSON structured logs.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Topology file, if any.
    pub topology: Option<PathBuf>,
    /// Transport settings.
    pub transport: TransportConfig,
    /// Log output format.
    pub log_format: LogFormat,
    /// Output format.
    pub format: OutputFormat,
}

impl Config {
    /// Loads and validates the effective topology.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the
    /// topology is invalid.
    pub fn load_topology(&self) -> corral_core::Result<Topology> {
        let topology = match &self.topology {
            Some(path) => Topology::from_file(path)?,
            None => Topology::default(),
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Builds the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport settings are unusable.
    pub fn transport(&self) -> corral_core::Result<HttpTransport> {
        HttpTransport::new(&self.transport)
    }
}

/// Maps a command result to the process exit status.
///
/// Bootstrap failures keep their distinguished codes and configuration
/// problems exit with [`EXIT_CONFIGURATION`].
#[must_use]
pub fn exit_code(result: &anyhow::Result<()>) -> i32 {
    let Err(err) = result else {
        return EXIT_SUCCESS;
    };
    if let Some(bootstrap) = err.downcast_ref::<corral_bootstrap::Error>() {
        return bootstrap.exit_code();
    }
    if err.downcast_ref::<corral_core::Error>().is_some() {
        return EXIT_CONFIGURATION;
    }
    EXIT_FAILURE
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use corral_bootstrap::error::{EXIT_CONVERGENCE_TIMEOUT, EXIT_UNREACHABLE};

    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "corral",
            "--topology",
            "/etc/corral/topology.json",
            "--scheme",
            "https",
            "--request-timeout-secs",
            "5",
            "--log-format",
            "json",
            "--format",
            "table",
            "status",
            "--group",
            "rs2",
        ]);

        let config = cli.config();
        assert_eq!(
            config.topology.as_deref(),
            Some(std::path::Path::new("/etc/corral/topology.json"))
        );
        assert_eq!(config.transport.scheme, "https");
        assert_eq!(config.transport.request_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(matches!(config.format, OutputFormat::Table));
        let Commands::Status(args) = cli.command else {
            panic!("expected status command");
        };
        assert_eq!(args.group.as_deref(), Some("rs2"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["corral", "bootstrap"]);
        let config = cli.config();
        assert_eq!(config.transport.scheme, "http");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(matches!(cli.command, Commands::Bootstrap));
        assert_eq!(config.load_topology().unwrap().convergence_target(), 9);
    }

    #[test]
    fn test_missing_topology_file_is_a_configuration_error() {
        let config = Config {
            topology: Some(PathBuf::from("/nonexistent/corral/topology.json")),
            ..Config::default()
        };
        let result = config
            .load_topology()
            .map(|_| ())
            .context("loading topology");
        assert_eq!(exit_code(&result), EXIT_CONFIGURATION);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Ok(())), EXIT_SUCCESS);

        let timeout: anyhow::Result<()> = Err(corral_bootstrap::Error::ConvergenceTimeout {
            healthy: 8,
            target: 9,
            ticks: 60,
        }
        .into());
        assert_eq!(exit_code(&timeout), EXIT_CONVERGENCE_TIMEOUT);

        let unreachable: anyhow::Result<()> = Err::<(), _>(corral_bootstrap::Error::Unreachable {
            endpoint: corral_core::Endpoint::loopback(40001),
            attempts: 60,
            source: corral_admin::CommandError::connectivity("refused"),
        })
        .context("bootstrap failed");
        assert_eq!(exit_code(&unreachable), EXIT_UNREACHABLE);

        let other: anyhow::Result<()> = Err(anyhow::anyhow!("write failed"));
        assert_eq!(exit_code(&other), EXIT_FAILURE);
    }
}
