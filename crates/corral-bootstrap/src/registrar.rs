//! Shard registrar.
//!
//! Registrations are independent. A shard that keeps failing is left
//! unregistered after its attempts run out and the next one proceeds.

use std::sync::Arc;

use corral_admin::{AdminCommand, Session};
use corral_core::observability::endpoint_span;
use corral_core::{BootstrapPolicy, Clock, Endpoint, Principal, RouterPlan, ShardRef};
use serde::Serialize;
use tracing::Instrument;

use crate::connector::Connector;
use crate::error::Result;

/// Result of registering one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardOutcome {
    /// Router the shard was registered with.
    pub router: Endpoint,
    /// The shard reference.
    pub shard: ShardRef,
    /// Whether the router acknowledged the shard.
    pub registered: bool,
    /// Attempts made.
    pub attempts: u32,
    /// Diagnostic from the last failed attempt.
    pub last_error: Option<String>,
}

/// Shard registration results across all routers, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationReport {
    /// One entry per shard reference.
    pub outcomes: Vec<ShardOutcome>,
}

impl RegistrationReport {
    /// Shards the routers acknowledged.
    pub fn registered(&self) -> impl Iterator<Item = &ShardOutcome> {
        self.outcomes.iter().filter(|o| o.registered)
    }

    /// Shards left unregistered.
    pub fn failed(&self) -> impl Iterator<Item = &ShardOutcome> {
        self.outcomes.iter().filter(|o| !o.registered)
    }
}

/// Registers shards with routers.
#[derive(Debug, Clone)]
pub struct ShardRegistrar {
    connector: Connector,
    clock: Arc<dyn Clock>,
    policy: BootstrapPolicy,
}

impl ShardRegistrar {
    /// Creates a registrar.
    #[must_use]
    pub fn new(connector: Connector, policy: &BootstrapPolicy) -> Self {
        Self {
            clock: Arc::clone(connector.clock()),
            connector,
            policy: policy.clone(),
        }
    }

    /// Registers every shard in `router`, in order.
    ///
    /// Routers that require it are authenticated as `admin` first.
    ///
    /// # Errors
    ///
    /// Returns an error only if the router cannot be connected.
    pub async fn register_shards(
        &self,
        router: &RouterPlan,
        admin: &Principal,
    ) -> Result<Vec<ShardOutcome>> {
        let span = endpoint_span("register", &router.endpoint.to_string());
        async {
            let mut session = self.connector.connect(&router.endpoint).await?;
            if router.requires_auth {
                self.authenticate(&mut session, admin).await;
            }

            let mut outcomes = Vec::with_capacity(router.shards.len());
            for shard in &router.shards {
                outcomes.push(self.register(&session, shard).await);
            }
            Ok(outcomes)
        }
        .instrument(span)
        .await
    }

    async fn authenticate(&self, session: &mut Session, admin: &Principal) {
        let attempts = self.policy.router_auth_attempts;
        for attempt in 1..=attempts {
            match session.authenticate(admin).await {
                Ok(()) => {
                    tracing::info!(principal = %admin.name, attempt, "authenticated with router");
                    return;
                }
                Err(err) => {
                    tracing::warn!(
                        principal = %admin.name,
                        attempt,
                        error = %err,
                        "router authentication failed"
                    );
                    if attempt < attempts {
                        self.clock.sleep(self.policy.auth_interval).await;
                    }
                }
            }
        }
        tracing::warn!(principal = %admin.name, "registering shards without authentication");
    }

    async fn register(&self, session: &Session, shard: &ShardRef) -> ShardOutcome {
        let command = AdminCommand::AddShard(shard.clone());
        let attempts = self.policy.shard_attempts;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match session.run(&command).await {
                Ok(_) => {
                    tracing::info!(%shard, attempt, "shard successfully added");
                    return ShardOutcome {
                        router: session.endpoint().clone(),
                        shard: shard.clone(),
                        registered: true,
                        attempts: attempt,
                        last_error: None,
                    };
                }
                Err(err) => {
                    let detail = err
                        .reply
                        .as_ref()
                        .map_or_else(|| err.to_string(), ToString::to_string);
                    tracing::warn!(%shard, attempt, error = %detail, "failed to add shard");
                    last_error = Some(detail);
                    if attempt < attempts {
                        self.clock.sleep(self.policy.shard_interval).await;
                    }
                }
            }
        }

        tracing::error!(%shard, attempts, "shard left unregistered");
        ShardOutcome {
            router: session.endpoint().clone(),
            shard: shard.clone(),
            registered: false,
            attempts,
            last_error,
        }
    }
}
