//! Retry ceilings and delays for the bootstrap sequence.
//!
//! Defaults match a local cluster started moments before bootstrap. Every
//! value can be overridden from the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CORRAL_CONNECT_ATTEMPTS` | 60 |
//! | `CORRAL_CONNECT_INTERVAL_MS` | 1000 |
//! | `CORRAL_POLL_TICKS` | 60 |
//! | `CORRAL_POLL_INTERVAL_MS` | 1000 |
//! | `CORRAL_CONFIG_SETTLE_MS` | 3000 |
//! | `CORRAL_PROVISION_ATTEMPTS` | 60 |
//! | `CORRAL_TRANSIENT_PAUSE_MS` | 500 |
//! | `CORRAL_AUTH_INTERVAL_MS` | 1000 |
//! | `CORRAL_READER_PAUSE_MS` | 500 |
//! | `CORRAL_ENDPOINT_SETTLE_MS` | 3000 |
//! | `CORRAL_PROVISION_SETTLE_MS` | 2000 |
//! | `CORRAL_SHARD_ATTEMPTS` | 10 |
//! | `CORRAL_SHARD_INTERVAL_MS` | 1000 |
//! | `CORRAL_ROUTER_AUTH_ATTEMPTS` | 10 |

use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

/// Timing policy for every bootstrap phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapPolicy {
    /// Connection attempts per endpoint before giving up.
    pub connect_attempts: u32,
    /// Delay between connection attempts.
    pub connect_interval: Duration,
    /// Convergence poll ticks before the deadline.
    pub poll_ticks: u32,
    /// Delay between convergence polls.
    pub poll_interval: Duration,
    /// Pause between config-layer initiation and replica initiation.
    pub config_settle: Duration,
    /// Attempts to create the admin principal, and to authenticate after a timeout.
    pub provision_attempts: u32,
    /// Pause before retrying after a key-propagation race.
    pub transient_pause: Duration,
    /// Delay between authentication attempts.
    pub auth_interval: Duration,
    /// Pause before creating the read-only principal.
    pub reader_pause: Duration,
    /// Pause after each provisioned endpoint.
    pub endpoint_settle: Duration,
    /// Pause between provisioning and shard registration.
    pub provision_settle: Duration,
    /// Registration attempts per shard.
    pub shard_attempts: u32,
    /// Delay between registration attempts.
    pub shard_interval: Duration,
    /// Authentication attempts against a router that requires it.
    pub router_auth_attempts: u32,
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        Self {
            connect_attempts: 60,
            connect_interval: Duration::from_secs(1),
            poll_ticks: 60,
            poll_interval: Duration::from_secs(1),
            config_settle: Duration::from_secs(3),
            provision_attempts: 60,
            transient_pause: Duration::from_millis(500),
            auth_interval: Duration::from_secs(1),
            reader_pause: Duration::from_millis(500),
            endpoint_settle: Duration::from_secs(3),
            provision_settle: Duration::from_secs(2),
            shard_attempts: 10,
            shard_interval: Duration::from_secs(1),
            router_auth_attempts: 10,
        }
    }
}

impl BootstrapPolicy {
    /// Loads the policy from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a variable is present but not a
    /// positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads the policy with a custom environment source.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a variable is present but not a
    /// positive integer.
    pub fn from_env_with<F>(get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let count = |name: &str, default: u32| -> Result<u32> {
            let value = parse_positive_u64_env(&get_env, name, u64::from(default))?;
            u32::try_from(value).map_err(|_| {
                Error::configuration(format!("{name} value {value} exceeds supported range"))
            })
        };
        let millis = |name: &str, default: Duration| -> Result<Duration> {
            let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
            parse_positive_u64_env(&get_env, name, default_ms).map(Duration::from_millis)
        };

        Ok(Self {
            connect_attempts: count("CORRAL_CONNECT_ATTEMPTS", defaults.connect_attempts)?,
            connect_interval: millis("CORRAL_CONNECT_INTERVAL_MS", defaults.connect_interval)?,
            poll_ticks: count("CORRAL_POLL_TICKS", defaults.poll_ticks)?,
            poll_interval: millis("CORRAL_POLL_INTERVAL_MS", defaults.poll_interval)?,
            config_settle: millis("CORRAL_CONFIG_SETTLE_MS", defaults.config_settle)?,
            provision_attempts: count("CORRAL_PROVISION_ATTEMPTS", defaults.provision_attempts)?,
            transient_pause: millis("CORRAL_TRANSIENT_PAUSE_MS", defaults.transient_pause)?,
            auth_interval: millis("CORRAL_AUTH_INTERVAL_MS", defaults.auth_interval)?,
            reader_pause: millis("CORRAL_READER_PAUSE_MS", defaults.reader_pause)?,
            endpoint_settle: millis("CORRAL_ENDPOINT_SETTLE_MS", defaults.endpoint_settle)?,
            provision_settle: millis("CORRAL_PROVISION_SETTLE_MS", defaults.provision_settle)?,
            shard_attempts: count("CORRAL_SHARD_ATTEMPTS", defaults.shard_attempts)?,
            shard_interval: millis("CORRAL_SHARD_INTERVAL_MS", defaults.shard_interval)?,
            router_auth_attempts: count(
                "CORRAL_ROUTER_AUTH_ATTEMPTS",
                defaults.router_auth_attempts,
            )?,
        })
    }
}

fn parse_positive_u64_env<F>(get_env: &F, name: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(name) else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }

    let value = trimmed.parse::<u64>().map_err(|e| {
        Error::configuration(format!("{name} must be a positive integer (got {trimmed}): {e}"))
    })?;
    if value == 0 {
        return Err(Error::configuration(format!("{name} must be greater than 0")));
    }
    Ok(value)
}
