//! Decoding of replication status replies.

use corral_core::{HealthSample, MemberRole, MemberStatus};
use serde::Deserialize;

use crate::transport::Document;

#[derive(Debug, Deserialize)]
struct StatusReply {
    #[serde(default)]
    members: Vec<MemberDoc>,
}

#[derive(Debug, Deserialize)]
struct MemberDoc {
    name: String,
    #[serde(default)]
    health: f64,
    #[serde(default)]
    state: i64,
}

/// Builds a health sample from a replication status reply.
///
/// A reply without a member list, or one that does not decode, yields an
/// empty sample: a group that has not started tracking status yet simply has
/// no healthy members.
#[must_use]
pub fn parse_health(reply: &Document) -> HealthSample {
    let Ok(status) = StatusReply::deserialize(reply) else {
        tracing::debug!(%reply, "status reply did not decode; treating as empty");
        return HealthSample::empty();
    };

    HealthSample::new(
        status
            .members
            .into_iter()
            .map(|m| MemberStatus::new(m.name, m.health >= 1.0, MemberRole::from_code(m.state)))
            .collect(),
    )
}
