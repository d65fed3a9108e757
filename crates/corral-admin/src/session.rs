//! Administrative sessions.

use std::sync::Arc;

use corral_core::{Endpoint, Principal};

use crate::command::AdminCommand;
use crate::reply::{CommandError, check_reply};
use crate::transport::{AdminTransport, Credentials, Document};

/// A live administrative session with one endpoint.
///
/// After a successful [`Session::authenticate`] every later command carries
/// the principal's credentials.
#[derive(Debug, Clone)]
pub struct Session {
    endpoint: Endpoint,
    transport: Arc<dyn AdminTransport>,
    credentials: Option<Credentials>,
}

impl Session {
    /// Creates an unauthenticated session.
    #[must_use]
    pub fn new(endpoint: Endpoint, transport: Arc<dyn AdminTransport>) -> Self {
        Self {
            endpoint,
            transport,
            credentials: None,
        }
    }

    /// Returns the endpoint this session talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns true once the session has authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Sends a command and unifies both failure conventions.
    ///
    /// # Errors
    ///
    /// Returns a classified [`CommandError`] if the transport fails or the
    /// reply is not `ok`.
    pub async fn run(&self, command: &AdminCommand) -> Result<Document, CommandError> {
        let reply = self
            .transport
            .execute(&self.endpoint, self.credentials.as_ref(), command)
            .await?;
        check_reply(reply)
    }

    /// Authenticates as `principal`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; the session stays unauthenticated.
    pub async fn authenticate(&mut self, principal: &Principal) -> Result<(), CommandError> {
        self.run(&AdminCommand::authenticate(principal)).await?;
        self.credentials = Some(Credentials::from(principal));
        Ok(())
    }
}
