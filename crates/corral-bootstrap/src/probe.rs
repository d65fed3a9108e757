//! Capability probe.

use corral_admin::{AdminCommand, Document, Session};
use corral_core::VersionTuple;
use serde::Serialize;
use serde_json::Value;

/// Version and feature flags of a connected server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Server version; empty when unknown.
    pub version: VersionTuple,
    /// Whether the server was built with TLS support.
    pub tls_enabled: bool,
}

impl Capabilities {
    /// Decodes capabilities from a build-info reply.
    ///
    /// `versionArray` is preferred over the `version` string. TLS support is
    /// signalled by a non-empty `OpenSSLVersion` string or an `openssl`
    /// document with a non-empty `running` field. Absent fields are negative.
    #[must_use]
    pub fn from_build_info(reply: &Document) -> Self {
        let from_array = reply
            .get("versionArray")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .map_while(|part| part.as_u64())
                    .collect::<Vec<_>>()
            })
            .filter(|parts| !parts.is_empty())
            .map(VersionTuple::new);
        let version = from_array.unwrap_or_else(|| {
            reply
                .get("version")
                .and_then(Value::as_str)
                .map(VersionTuple::parse_lenient)
                .unwrap_or_default()
        });

        let legacy_tls = reply
            .get("OpenSSLVersion")
            .and_then(Value::as_str)
            .is_some_and(|v| !v.is_empty());
        let tls = reply
            .get("openssl")
            .and_then(|o| o.get("running"))
            .and_then(Value::as_str)
            .is_some_and(|v| !v.is_empty() && v != "disabled");

        Self {
            version,
            tls_enabled: legacy_tls || tls,
        }
    }

    /// Returns true if the server version is at least `threshold`.
    #[must_use]
    pub fn version_at_least(&self, threshold: &VersionTuple) -> bool {
        self.version.at_least(threshold)
    }
}

/// Queries a session for its capabilities.
///
/// Never fails: an error reply yields negative capabilities.
pub async fn probe(session: &Session) -> Capabilities {
    match session.run(&AdminCommand::BuildInfo).await {
        Ok(reply) => {
            let capabilities = Capabilities::from_build_info(&reply);
            tracing::info!(
                endpoint = %session.endpoint(),
                version = %capabilities.version,
                tls = capabilities.tls_enabled,
                "probed server capabilities"
            );
            capabilities
        }
        Err(err) => {
            tracing::warn!(
                endpoint = %session.endpoint(),
                error = %err,
                "build info unavailable, assuming no optional capabilities"
            );
            Capabilities::default()
        }
    }
}
