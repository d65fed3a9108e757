//! Credential provisioner.
//!
//! Endpoints are provisioned one after another. Every step is best effort:
//! at bootstrap time the dominant failures are transient, so problems are
//! logged and reported rather than aborting the run.

use std::sync::Arc;

use corral_admin::{AdminCommand, CommandError, ErrorClass, Session};
use corral_core::observability::endpoint_span;
use corral_core::{BootstrapPolicy, Clock, Endpoint, Principal};
use serde::Serialize;
use tracing::Instrument;

use crate::connector::Connector;
use crate::error::Result;

/// Result of a principal creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum CreateOutcome {
    /// The principal was created.
    Created,
    /// The principal already existed, which counts as success.
    AlreadyExists,
    /// Creation failed; holds the last error.
    Failed(String),
}

impl CreateOutcome {
    /// Returns true for created or already existing.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::AlreadyExists)
    }
}

/// What happened on one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointProvision {
    /// The provisioned endpoint.
    pub endpoint: Endpoint,
    /// Admin principal creation outcome.
    pub admin: CreateOutcome,
    /// Creation attempts made for the admin principal.
    pub create_attempts: u32,
    /// Whether any creation attempt timed out.
    pub timed_out: bool,
    /// Whether authentication as the admin principal succeeded.
    pub authenticated: bool,
    /// Authentication attempts made.
    pub auth_attempts: u32,
    /// Read-only principal creation outcome.
    pub reader: CreateOutcome,
}

/// Per-endpoint provisioning results, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvisionReport {
    /// One entry per provisioned endpoint.
    pub endpoints: Vec<EndpointProvision>,
}

impl ProvisionReport {
    /// Returns true if every endpoint ended with both principals usable.
    #[must_use]
    pub fn fully_provisioned(&self) -> bool {
        self.endpoints
            .iter()
            .all(|e| e.admin.is_success() && e.authenticated && e.reader.is_success())
    }
}

/// Creates administrative and read-only principals on entry points.
#[derive(Debug, Clone)]
pub struct CredentialProvisioner {
    connector: Connector,
    clock: Arc<dyn Clock>,
    policy: BootstrapPolicy,
}

impl CredentialProvisioner {
    /// Creates a provisioner.
    #[must_use]
    pub fn new(connector: Connector, policy: &BootstrapPolicy) -> Self {
        Self {
            clock: Arc::clone(connector.clock()),
            connector,
            policy: policy.clone(),
        }
    }

    /// Provisions `admin` and `reader` on every target, sequentially.
    ///
    /// # Errors
    ///
    /// Returns an error only if a target cannot be connected at all.
    pub async fn provision(
        &self,
        targets: &[Endpoint],
        admin: &Principal,
        reader: &Principal,
    ) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        for endpoint in targets {
            let span = endpoint_span("provision", &endpoint.to_string());
            let outcome = async {
                tracing::info!("configuring auth");
                let session = self.connector.connect(endpoint).await?;
                Ok::<_, crate::error::Error>(self.provision_endpoint(session, admin, reader).await)
            }
            .instrument(span)
            .await?;
            report.endpoints.push(outcome);

            self.clock.sleep(self.policy.endpoint_settle).await;
        }

        Ok(report)
    }

    async fn provision_endpoint(
        &self,
        mut session: Session,
        admin: &Principal,
        reader: &Principal,
    ) -> EndpointProvision {
        let (admin_outcome, create_attempts, timed_out) = self.create_admin(&session, admin).await;
        let (authenticated, auth_attempts) =
            self.authenticate(&mut session, admin, timed_out).await;

        self.clock.sleep(self.policy.reader_pause).await;
        let reader_outcome = match session.run(&AdminCommand::CreatePrincipal(reader.clone())).await
        {
            Ok(_) => CreateOutcome::Created,
            Err(err) if err.class == ErrorClass::AlreadyExists => CreateOutcome::AlreadyExists,
            Err(err) => {
                tracing::warn!(
                    principal = %reader.name,
                    error = %err,
                    "read-only principal not created"
                );
                CreateOutcome::Failed(err.to_string())
            }
        };

        EndpointProvision {
            endpoint: session.endpoint().clone(),
            admin: admin_outcome,
            create_attempts,
            timed_out,
            authenticated,
            auth_attempts,
            reader: reader_outcome,
        }
    }

    /// Creates the admin principal, returning the outcome, attempts used,
    /// and whether any attempt timed out.
    async fn create_admin(
        &self,
        session: &Session,
        admin: &Principal,
    ) -> (CreateOutcome, u32, bool) {
        let command = AdminCommand::CreatePrincipal(admin.clone());
        let mut timed_out = false;
        let mut last_error: Option<CommandError> = None;

        for attempt in 1..=self.policy.provision_attempts {
            let err = match session.run(&command).await {
                Ok(_) => {
                    tracing::info!(principal = %admin.name, attempt, "admin principal created");
                    return (CreateOutcome::Created, attempt, timed_out);
                }
                Err(err) => err,
            };

            tracing::warn!(
                principal = %admin.name,
                attempt,
                error = %err,
                "create principal returned an error"
            );
            match err.class {
                ErrorClass::AlreadyExists => {
                    return (CreateOutcome::AlreadyExists, attempt, timed_out);
                }
                ErrorClass::Timeout => timed_out = true,
                ErrorClass::TransientSecurity => {
                    self.clock.sleep(self.policy.transient_pause).await;
                }
                _ => {}
            }
            last_error = Some(err);
        }

        let message = last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string());
        tracing::error!(
            principal = %admin.name,
            error = %message,
            "admin principal creation exhausted"
        );
        (
            CreateOutcome::Failed(message),
            self.policy.provision_attempts,
            timed_out,
        )
    }

    /// Authenticates as the admin principal.
    ///
    /// Failures are retried only after a creation timeout, when the principal
    /// may still be replicating. Otherwise the first failure means the
    /// credentials do not match and retrying cannot help.
    async fn authenticate(
        &self,
        session: &mut Session,
        admin: &Principal,
        timed_out: bool,
    ) -> (bool, u32) {
        let attempts = self.policy.provision_attempts;

        for attempt in 1..=attempts {
            match session.authenticate(admin).await {
                Ok(()) => {
                    tracing::info!(principal = %admin.name, attempt, "authenticated");
                    return (true, attempt);
                }
                Err(err) if timed_out => {
                    tracing::warn!(
                        principal = %admin.name,
                        attempt,
                        error = %err,
                        "authentication failed after timeout, retrying"
                    );
                    if attempt < attempts {
                        self.clock.sleep(self.policy.auth_interval).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        principal = %admin.name,
                        error = %err,
                        "authentication failed, not retrying"
                    );
                    return (false, attempt);
                }
            }
        }

        (false, attempts)
    }
}
