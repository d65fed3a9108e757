//! The transport seam between the orchestrator and the wire.

use std::fmt;

use async_trait::async_trait;
use corral_core::{Endpoint, Principal};

use crate::command::AdminCommand;
use crate::reply::CommandError;

/// A command reply document.
pub type Document = serde_json::Value;

/// Credentials attached to commands once a session has authenticated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub secret: String,
}

impl From<&Principal> for Credentials {
    fn from(principal: &Principal) -> Self {
        Self {
            user: principal.name.clone(),
            secret: principal.secret.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Executes administrative commands against endpoints.
///
/// Implementations return the raw reply document, including replies whose
/// `ok` field signals failure; [`crate::Session`] unifies the two styles.
/// Transport-level failures are returned as classified [`CommandError`]s.
#[async_trait]
pub trait AdminTransport: Send + Sync + fmt::Debug {
    /// Sends `command` to `endpoint`.
    async fn execute(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&Credentials>,
        command: &AdminCommand,
    ) -> Result<Document, CommandError>;
}
