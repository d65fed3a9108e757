//! Bootstrap sequencer.
//!
//! Owns the run from start to finish and drives the phases in their fixed
//! order. Fatal errors from connection, initiation, or convergence abort
//! the run; provisioning and registration results are reported.

use std::collections::HashMap;
use std::sync::Arc;

use corral_admin::{AdminTransport, Session};
use corral_core::observability::phase_span;
use corral_core::{BootstrapPolicy, Clock, Endpoint, Error as CoreError, GroupConfig, Topology};
use serde::Serialize;
use tracing::Instrument;

use crate::connector::Connector;
use crate::error::Result;
use crate::initiator::{initiate, initiate_config_layer};
use crate::poller::{ConvergencePoller, ConvergenceReport, GroupProbe};
use crate::probe::{Capabilities, probe};
use crate::provisioner::{CredentialProvisioner, ProvisionReport};
use crate::registrar::{RegistrationReport, ShardRegistrar};

/// Everything a completed bootstrap observed.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    /// Capabilities of the probe endpoint.
    pub capabilities: Capabilities,
    /// Whether config-layer groups were initiated.
    pub config_layer_initiated: bool,
    /// Tick and per-group health at convergence.
    pub convergence: ConvergenceReport,
    /// Credential provisioning results.
    pub provisioning: ProvisionReport,
    /// Shard registration results.
    pub registration: RegistrationReport,
}

/// Drives a topology from bare endpoints to a converged cluster.
#[derive(Debug)]
pub struct Bootstrapper {
    topology: Topology,
    connector: Connector,
    clock: Arc<dyn Clock>,
    policy: BootstrapPolicy,
}

impl Bootstrapper {
    /// Creates a bootstrapper.
    #[must_use]
    pub fn new(
        topology: Topology,
        transport: Arc<dyn AdminTransport>,
        clock: Arc<dyn Clock>,
        policy: BootstrapPolicy,
    ) -> Self {
        let connector = Connector::new(transport, Arc::clone(&clock), &policy);
        Self {
            topology,
            connector,
            clock,
            policy,
        }
    }

    /// Returns the topology being bootstrapped.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Runs every phase in order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: an invalid topology, an unreachable
    /// endpoint, a rejected initiation, or a convergence timeout.
    pub async fn run(&self) -> Result<BootstrapReport> {
        self.topology.validate()?;

        let sessions = self
            .connect_all()
            .instrument(phase_span("connect"))
            .await?;
        let probe_session = lookup(&sessions, &self.topology.probe)?;
        let capabilities = probe(probe_session).instrument(phase_span("probe")).await;

        let config_layer_initiated = self
            .initiate_all(&sessions, &capabilities)
            .instrument(phase_span("initiate"))
            .await?;

        let convergence = self
            .await_convergence(&sessions)
            .instrument(phase_span("converge"))
            .await?;

        let provisioning = CredentialProvisioner::new(self.connector.clone(), &self.policy)
            .provision(
                &self.topology.auth.targets(capabilities.tls_enabled),
                &self.topology.auth.admin,
                &self.topology.auth.reader,
            )
            .instrument(phase_span("provision"))
            .await?;
        self.clock.sleep(self.policy.provision_settle).await;

        let registration = self
            .register_all()
            .instrument(phase_span("register"))
            .await?;

        tracing::info!(
            tick = convergence.tick,
            registered = registration.registered().count(),
            unregistered = registration.failed().count(),
            "bootstrap complete"
        );

        Ok(BootstrapReport {
            capabilities,
            config_layer_initiated,
            convergence,
            provisioning,
            registration,
        })
    }

    async fn connect_all(&self) -> Result<HashMap<Endpoint, Session>> {
        let endpoints = self.topology.fixed_endpoints()?;
        let mut sessions = HashMap::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let session = self.connector.connect(&endpoint).await?;
            sessions.insert(endpoint, session);
        }
        tracing::info!(endpoints = sessions.len(), "all fixed endpoints reachable");
        Ok(sessions)
    }

    async fn initiate_all(
        &self,
        sessions: &HashMap<Endpoint, Session>,
        capabilities: &Capabilities,
    ) -> Result<bool> {
        let config_groups = with_seeds(&self.topology.config_groups, sessions)?;
        let initiated = initiate_config_layer(
            &config_groups,
            capabilities,
            &self.topology.config_layer_min_version,
        )
        .await?;
        self.clock.sleep(self.policy.config_settle).await;

        for (group, session) in with_seeds(&self.topology.replica_groups, sessions)? {
            initiate(session, group).await?;
        }
        Ok(initiated)
    }

    async fn await_convergence(
        &self,
        sessions: &HashMap<Endpoint, Session>,
    ) -> Result<ConvergenceReport> {
        let probes: Vec<GroupProbe<'_>> = with_seeds(&self.topology.replica_groups, sessions)?
            .into_iter()
            .map(|(group, session)| GroupProbe { group, session })
            .collect();
        ConvergencePoller::new(Arc::clone(&self.clock), &self.policy)
            .poll(&probes, self.topology.convergence_target())
            .await
    }

    async fn register_all(&self) -> Result<RegistrationReport> {
        let registrar = ShardRegistrar::new(self.connector.clone(), &self.policy);
        let mut report = RegistrationReport::default();
        for router in &self.topology.routers {
            let outcomes = registrar
                .register_shards(router, &self.topology.auth.admin)
                .await?;
            report.outcomes.extend(outcomes);
        }
        Ok(report)
    }
}

fn lookup<'a>(
    sessions: &'a HashMap<Endpoint, Session>,
    endpoint: &Endpoint,
) -> Result<&'a Session> {
    sessions.get(endpoint).ok_or_else(|| {
        CoreError::configuration(format!("no session was opened for {endpoint}")).into()
    })
}

fn with_seeds<'a>(
    groups: &'a [GroupConfig],
    sessions: &'a HashMap<Endpoint, Session>,
) -> Result<Vec<(&'a GroupConfig, &'a Session)>> {
    groups
        .iter()
        .map(|group| Ok((group, lookup(sessions, group.seed()?)?)))
        .collect()
}
