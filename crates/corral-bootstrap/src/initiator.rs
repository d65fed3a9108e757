//! Topology initiator.
//!
//! Initiation is sent exactly once per group and never retried: a rejection
//! means the group was already initiated or the declaration is broken, and
//! both need an operator.

use corral_admin::{AdminCommand, Session};
use corral_core::{GroupConfig, VersionTuple};

use crate::error::{Error, Result};
use crate::probe::Capabilities;

/// Sends the initiate command for `group` to its seed session.
///
/// # Errors
///
/// Returns [`Error::Initiation`] if the command fails in any way.
pub async fn initiate(seed: &Session, group: &GroupConfig) -> Result<()> {
    tracing::info!(
        group = %group.id,
        seed = %seed.endpoint(),
        members = group.member_count(),
        config_server = group.config_server,
        "initiating group"
    );

    seed.run(&AdminCommand::Initiate(group.clone()))
        .await
        .map_err(|source| {
            tracing::error!(group = %group.id, error = %source, "initiation rejected");
            Error::Initiation {
                group: group.id.clone(),
                endpoint: seed.endpoint().clone(),
                source,
            }
        })?;
    Ok(())
}

/// Initiates config-layer groups when the server version requires it.
///
/// Older servers manage the config layer implicitly, so nothing is sent when
/// the probed version is below `min_version`. Returns whether any group was
/// initiated.
///
/// # Errors
///
/// Returns [`Error::Initiation`] on the first rejected group.
pub async fn initiate_config_layer(
    groups: &[(&GroupConfig, &Session)],
    capabilities: &Capabilities,
    min_version: &VersionTuple,
) -> Result<bool> {
    if groups.is_empty() {
        return Ok(false);
    }
    if !capabilities.version_at_least(min_version) {
        tracing::info!(
            version = %capabilities.version,
            required = %min_version,
            "server manages the config layer implicitly, skipping config group initiation"
        );
        return Ok(false);
    }

    tracing::info!(version = %capabilities.version, "configuring config servers");
    for (group, session) in groups {
        initiate(session, group).await?;
    }
    Ok(true)
}
