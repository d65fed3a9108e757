//! Convergence poller.
//!
//! Each tick samples every replica group's status and sums the healthy
//! counts. The cluster is ready only when that sum equals the declared
//! member total: every member healthy, not just a majority, and every group
//! under an elected primary.

use std::sync::Arc;
use std::time::Duration;

use corral_admin::{AdminCommand, Session, parse_health};
use corral_core::{BootstrapPolicy, Clock, GroupConfig, GroupHealth, HealthSample};
use serde::Serialize;

use crate::error::{Error, Result};

/// A group to poll and the session that reaches it.
#[derive(Debug, Clone, Copy)]
pub struct GroupProbe<'a> {
    /// Declared group.
    pub group: &'a GroupConfig,
    /// Session to the group's seed.
    pub session: &'a Session,
}

/// Outcome of a successful poll.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceReport {
    /// Zero-based tick at which convergence was observed.
    pub tick: u32,
    /// Healthy members at that tick.
    pub healthy: usize,
    /// Declared member total.
    pub target: usize,
    /// Per-group health at that tick.
    pub groups: Vec<GroupHealth>,
}

/// Fetches and assesses one group's status.
///
/// A failed status command counts as an empty sample: the group may simply
/// not be tracking status yet.
pub async fn sample_group(session: &Session, group: &GroupConfig) -> GroupHealth {
    let sample = match session.run(&AdminCommand::ReplicationStatus).await {
        Ok(reply) => parse_health(&reply),
        Err(err) => {
            tracing::debug!(group = %group.id, error = %err, "status unavailable");
            HealthSample::empty()
        }
    };
    sample.assess(group)
}

/// Polls replica groups until they converge or the deadline passes.
#[derive(Debug, Clone)]
pub struct ConvergencePoller {
    clock: Arc<dyn Clock>,
    ticks: u32,
    interval: Duration,
}

impl ConvergencePoller {
    /// Creates a poller using the policy's tick ceiling and interval.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: &BootstrapPolicy) -> Self {
        Self {
            clock,
            ticks: policy.poll_ticks,
            interval: policy.poll_interval,
        }
    }

    /// Blocks until the summed healthy count equals `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConvergenceTimeout`] when the tick ceiling is reached.
    pub async fn poll(
        &self,
        groups: &[GroupProbe<'_>],
        target: usize,
    ) -> Result<ConvergenceReport> {
        let mut healthy = 0;

        for tick in 0..self.ticks {
            let mut healths = Vec::with_capacity(groups.len());
            for probe in groups {
                healths.push(sample_group(probe.session, probe.group).await);
            }
            healthy = healths.iter().map(|h| h.healthy).sum();

            tracing::info!(tick, healthy, target, "replica groups have {healthy} healthy nodes");
            for health in &healths {
                tracing::debug!(
                    group = %health.group_id,
                    healthy = health.healthy,
                    declared = health.declared,
                    primary = health.has_primary,
                    state = %health.state(),
                    "group health"
                );
            }

            if healthy == target {
                return Ok(ConvergenceReport {
                    tick,
                    healthy,
                    target,
                    groups: healths,
                });
            }

            self.clock.sleep(self.interval).await;
        }

        tracing::error!(
            healthy,
            target,
            ticks = self.ticks,
            "replica groups didn't sync up properly"
        );
        Err(Error::ConvergenceTimeout {
            healthy,
            target,
            ticks: self.ticks,
        })
    }
}
