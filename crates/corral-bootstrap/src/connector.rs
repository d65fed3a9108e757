//! Endpoint connector.

use std::sync::Arc;
use std::time::Duration;

use corral_admin::{AdminCommand, AdminTransport, Session};
use corral_core::{BootstrapPolicy, Clock, Endpoint};

use crate::error::{Error, Result};

/// Opens sessions, retrying while servers are not yet listening.
#[derive(Debug, Clone)]
pub struct Connector {
    transport: Arc<dyn AdminTransport>,
    clock: Arc<dyn Clock>,
    attempts: u32,
    interval: Duration,
}

impl Connector {
    /// Creates a connector using the policy's connection ceiling and interval.
    #[must_use]
    pub fn new(
        transport: Arc<dyn AdminTransport>,
        clock: Arc<dyn Clock>,
        policy: &BootstrapPolicy,
    ) -> Self {
        Self {
            transport,
            clock,
            attempts: policy.connect_attempts,
            interval: policy.connect_interval,
        }
    }

    /// Returns the clock retries wait on.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Connects to `endpoint`.
    ///
    /// Connection-level failures are retried up to the attempt ceiling. Any
    /// reply, even an error reply, proves the server is listening.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] once the ceiling is reached.
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<Session> {
        let session = Session::new(endpoint.clone(), Arc::clone(&self.transport));
        let mut attempt = 1;

        loop {
            match session.run(&AdminCommand::Ping).await {
                Ok(_) => {
                    tracing::debug!(%endpoint, attempt, "connected");
                    return Ok(session);
                }
                Err(err) if err.class.is_connection_level() => {
                    if attempt >= self.attempts {
                        tracing::error!(%endpoint, attempt, error = %err, "giving up on endpoint");
                        return Err(Error::Unreachable {
                            endpoint: endpoint.clone(),
                            attempts: attempt,
                            source: err,
                        });
                    }
                    tracing::info!(%endpoint, attempt, error = %err, "can't connect yet, retrying");
                    self.clock.sleep(self.interval).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::debug!(%endpoint, error = %err, "endpoint answered with an error");
                    return Ok(session);
                }
            }
        }
    }
}
