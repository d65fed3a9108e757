//! Replica group health samples.
//!
//! A [`HealthSample`] is taken fresh on every poll tick and dropped once the
//! convergence decision is made. [`HealthSample::assess`] applies the
//! healthy-count rule against the declared group.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::topology::GroupConfig;

/// Replication role reported for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    /// The elected primary.
    Primary,
    /// A secondary in steady replication.
    Secondary,
    /// Any other state (startup, recovering, down, arbiter, unknown), by wire code.
    Other(i64),
}

impl MemberRole {
    /// Maps a numeric replication state code to a role.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Primary,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }

    /// Returns true for primary or secondary.
    #[must_use]
    pub const fn is_serving(self) -> bool {
        matches!(self, Self::Primary | Self::Secondary)
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "PRIMARY"),
            Self::Secondary => write!(f, "SECONDARY"),
            Self::Other(code) => write!(f, "STATE({code})"),
        }
    }
}

/// Runtime status of one member as reported by the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStatus {
    /// Member host as configured in the group.
    pub name: String,
    /// Liveness flag.
    pub alive: bool,
    /// Replication role.
    pub role: MemberRole,
}

impl MemberStatus {
    /// Creates a member status.
    #[must_use]
    pub fn new(name: impl Into<String>, alive: bool, role: MemberRole) -> Self {
        Self {
            name: name.into(),
            alive,
            role,
        }
    }
}

/// Snapshot of one group's runtime state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSample {
    members: Vec<MemberStatus>,
}

impl HealthSample {
    /// Creates a sample from reported member statuses.
    #[must_use]
    pub fn new(members: Vec<MemberStatus>) -> Self {
        Self { members }
    }

    /// A sample for a group that reported no status yet.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the reported members.
    #[must_use]
    pub fn members(&self) -> &[MemberStatus] {
        &self.members
    }

    /// Computes the group's health against its declaration.
    ///
    /// A member counts as healthy when it is alive, serving as primary or
    /// secondary, and declared in `group`; each member counts once. Without a
    /// primary the healthy count is zero no matter how many secondaries are up.
    #[must_use]
    pub fn assess(&self, group: &GroupConfig) -> GroupHealth {
        let mut counted = HashSet::new();
        let mut has_primary = false;

        for member in &self.members {
            if member.alive
                && member.role.is_serving()
                && group.declares(&member.name)
                && counted.insert(member.name.as_str())
            {
                has_primary |= member.role == MemberRole::Primary;
            }
        }

        GroupHealth {
            group_id: group.id.clone(),
            healthy: if has_primary { counted.len() } else { 0 },
            has_primary,
            declared: group.member_count(),
        }
    }
}

/// Convergence state of a single group for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvergenceState {
    /// Fewer healthy members than declared, or no primary.
    NotConverged,
    /// Every declared member is healthy and a primary is elected.
    Converged,
}

impl std::fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotConverged => "NOT_CONVERGED",
            Self::Converged => "CONVERGED",
        };
        write!(f, "{s}")
    }
}

/// Health of one group as computed from a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHealth {
    /// Group identifier.
    pub group_id: String,
    /// Healthy members counted this tick (zero without a primary).
    pub healthy: usize,
    /// Whether a counted member holds the primary role.
    pub has_primary: bool,
    /// Declared member count.
    pub declared: usize,
}

impl GroupHealth {
    /// Returns the group's convergence state.
    #[must_use]
    pub fn state(&self) -> ConvergenceState {
        if self.has_primary && self.healthy == self.declared {
            ConvergenceState::Converged
        } else {
            ConvergenceState::NotConverged
        }
    }
}
