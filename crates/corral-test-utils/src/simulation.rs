//! Deterministic simulation of a cluster under bootstrap.
//!
//! [`SimulatedCluster`] answers administrative commands from in-memory
//! state and records every call against a [`SimulatedClock`]. Waiting on
//! the clock advances simulated time instantly, so a bootstrap that would
//! take minutes against real servers runs in microseconds.
//!
//! # Key Features
//!
//! - **Clock Control**: waits advance simulated time and are recorded
//! - **Group Behavior**: per-group convergence timing and permanent shortfalls
//! - **Scripted Replies**: one-shot or persistent replies per endpoint and command
//! - **Fault Injection**: seeded random connection and status failures
//! - **Operation Recording**: every command with its simulated timestamp
//!
//! # Example
//!
//! ```rust,ignore
//! use corral_test_utils::simulation::{FaultConfig, SimulatedCluster};
//!
//! let cluster = SimulatedCluster::with_seed(7)
//!     .converge_after("rs1", 6)
//!     .unreachable_for(Endpoint::loopback(40011), 3)
//!     .with_faults(FaultConfig::flaky_network())
//!     .shared();
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use corral_admin::reply::reply_ok;
use corral_admin::{AdminCommand, AdminTransport, CommandError, Credentials, Document};
use corral_core::{Clock, Endpoint, GroupConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

/// Configuration for fault injection.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability that a ping is refused (0.0 - 1.0).
    pub connect_failure_rate: f64,

    /// Probability that a status request fails.
    pub status_failure_rate: f64,

    /// Probability that a principal creation times out.
    pub create_timeout_rate: f64,
}

impl FaultConfig {
    /// Creates a config with no faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Creates a config simulating servers that are slow to come up.
    #[must_use]
    pub fn flaky_network() -> Self {
        Self {
            connect_failure_rate: 0.3,
            status_failure_rate: 0.2,
            create_timeout_rate: 0.0,
        }
    }

    /// Creates a config where principal writes time out at `rate`.
    #[must_use]
    pub fn slow_writes(rate: f64) -> Self {
        Self {
            create_timeout_rate: rate,
            ..Self::default()
        }
    }
}

/// A command the cluster answered.
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    /// Simulated timestamp of the call.
    pub timestamp: DateTime<Utc>,
    /// Simulated time since the start of the run.
    pub elapsed: Duration,
    /// Target endpoint.
    pub endpoint: Endpoint,
    /// Wire name of the command.
    pub command: &'static str,
    /// Whether credentials were attached.
    pub authenticated: bool,
    /// Whether the call succeeded with an `ok` reply.
    pub success: bool,
}

impl RecordedCommand {
    /// Returns true if the command succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Simulated clock for deterministic time control.
#[derive(Debug)]
pub struct SimulatedClock {
    /// Base time (start of simulation).
    base: DateTime<Utc>,
    /// Elapsed milliseconds since base.
    elapsed_ms: AtomicU64,
    /// Every wait requested through [`Clock::sleep`].
    sleeps: Mutex<Vec<Duration>>,
}

impl SimulatedClock {
    /// Creates a new simulated clock starting at the given time.
    #[must_use]
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            elapsed_ms: AtomicU64::new(0),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Creates a clock anchored at a deterministic epoch (Unix epoch).
    #[must_use]
    pub fn deterministic() -> Self {
        let base = Utc
            .timestamp_millis_opt(0)
            .single()
            .expect("valid epoch timestamp");
        Self::new(base)
    }

    /// Returns the current simulated time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = i64::try_from(self.elapsed_ms.load(Ordering::Relaxed)).unwrap_or(i64::MAX);
        self.base + chrono::Duration::milliseconds(elapsed)
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Returns elapsed time since simulation start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed))
    }

    /// Returns every wait requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("lock poisoned").clone()
    }

    /// Returns how many waits of exactly `duration` were requested.
    #[must_use]
    pub fn sleeps_of(&self, duration: Duration) -> usize {
        self.sleeps
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|d| **d == duration)
            .count()
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::deterministic()
    }
}

#[async_trait]
impl Clock for SimulatedClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("lock poisoned").push(duration);
        self.advance(duration);
    }
}

/// How a group's members report once initiated.
#[derive(Debug, Clone, Copy)]
struct GroupBehavior {
    /// Status poll from which members report healthy; `None` never does.
    healthy_from_poll: Option<u32>,
    /// Trailing members that stay down even once the group is healthy.
    short_by: usize,
}

impl Default for GroupBehavior {
    fn default() -> Self {
        Self {
            healthy_from_poll: Some(1),
            short_by: 0,
        }
    }
}

#[derive(Debug)]
struct GroupState {
    config: GroupConfig,
    polls: u32,
}

#[derive(Debug, Default)]
struct ClusterState {
    unreachable: HashMap<Endpoint, u32>,
    behaviors: HashMap<String, GroupBehavior>,
    groups: HashMap<Endpoint, GroupState>,
    initiated: Vec<String>,
    principals: HashMap<Endpoint, HashMap<String, String>>,
    secured: Vec<Endpoint>,
    shards: HashMap<Endpoint, Vec<String>>,
    scripted: HashMap<(Endpoint, &'static str), VecDeque<Document>>,
    persistent: HashMap<(Endpoint, &'static str), Document>,
}

/// In-memory cluster implementing [`AdminTransport`].
///
/// Groups come into existence when initiated; their seed endpoint then
/// answers status requests. Principals are tracked per endpoint. Secured
/// endpoints reject commands from unauthenticated sessions once a principal
/// exists there, mirroring the localhost exception of real servers.
#[derive(Debug)]
pub struct SimulatedCluster {
    seed: u64,
    rng: Mutex<StdRng>,
    faults: FaultConfig,
    clock: Arc<SimulatedClock>,
    build_info: Document,
    state: Mutex<ClusterState>,
    operations: Mutex<Vec<RecordedCommand>>,
}

impl SimulatedCluster {
    /// Creates a cluster with seed 0 and a modern, TLS-less build.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates a cluster whose random faults are drawn from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            faults: FaultConfig::default(),
            clock: Arc::new(SimulatedClock::deterministic()),
            build_info: json!({"ok": 1, "version": "3.6.2", "versionArray": [3, 6, 2, 0]}),
            state: Mutex::new(ClusterState::default()),
            operations: Mutex::new(Vec::new()),
        }
    }

    /// Returns the seed used for fault injection.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sets the fault configuration.
    #[must_use]
    pub fn with_faults(mut self, faults: FaultConfig) -> Self {
        self.faults = faults;
        self
    }

    /// Reports `version` from build info.
    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.build_info = json!({"ok": 1, "version": version});
        self
    }

    /// Reports TLS support from build info.
    #[must_use]
    pub fn with_tls(mut self) -> Self {
        self.build_info["OpenSSLVersion"] = Value::from("OpenSSL 1.0.2g  1 Mar 2016");
        self
    }

    /// Refuses the first `attempts` commands sent to `endpoint`.
    #[must_use]
    pub fn unreachable_for(self, endpoint: Endpoint, attempts: u32) -> Self {
        self.lock().unreachable.insert(endpoint, attempts);
        self
    }

    /// Makes `group` report healthy from its `poll`-th status request on.
    #[must_use]
    pub fn converge_after(self, group: &str, poll: u32) -> Self {
        self.set_behavior(group, |b| b.healthy_from_poll = Some(poll));
        self
    }

    /// Makes `group` never report healthy members.
    #[must_use]
    pub fn never_converge(self, group: &str) -> Self {
        self.set_behavior(group, |b| b.healthy_from_poll = None);
        self
    }

    /// Keeps the last `members` of `group` down permanently.
    #[must_use]
    pub fn short_by(self, group: &str, members: usize) -> Self {
        self.set_behavior(group, |b| b.short_by = members);
        self
    }

    /// Requires authentication on `endpoint` once it has a principal.
    #[must_use]
    pub fn secured(self, endpoint: Endpoint) -> Self {
        self.lock().secured.push(endpoint);
        self
    }

    /// Answers the next `command` on `endpoint` with `reply`, once.
    ///
    /// Replies queue up in order; once exhausted the default behavior resumes.
    #[must_use]
    pub fn script(self, endpoint: &Endpoint, command: &'static str, reply: Document) -> Self {
        self.lock()
            .scripted
            .entry((endpoint.clone(), command))
            .or_default()
            .push_back(reply);
        self
    }

    /// Answers every `command` on `endpoint` with `reply`.
    #[must_use]
    pub fn always(self, endpoint: &Endpoint, command: &'static str, reply: Document) -> Self {
        self.lock()
            .persistent
            .insert((endpoint.clone(), command), reply);
        self
    }

    /// Wraps the cluster for sharing with a bootstrapper.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Returns the clock commands are timestamped with.
    #[must_use]
    pub fn clock(&self) -> Arc<SimulatedClock> {
        Arc::clone(&self.clock)
    }

    /// Returns all recorded commands.
    #[must_use]
    pub fn operations(&self) -> Vec<RecordedCommand> {
        self.operations.lock().expect("lock poisoned").clone()
    }

    /// Returns recorded commands matching a filter.
    #[must_use]
    pub fn operations_where<F>(&self, filter: F) -> Vec<RecordedCommand>
    where
        F: Fn(&RecordedCommand) -> bool,
    {
        self.operations
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|op| filter(op))
            .cloned()
            .collect()
    }

    /// Counts recorded `command` calls across all endpoints.
    #[must_use]
    pub fn count(&self, command: &str) -> usize {
        self.operations_where(|op| op.command == command).len()
    }

    /// Counts recorded `command` calls sent to `endpoint`.
    #[must_use]
    pub fn count_at(&self, endpoint: &Endpoint, command: &str) -> usize {
        self.operations_where(|op| op.command == command && op.endpoint == *endpoint)
            .len()
    }

    /// Group ids in initiation order.
    #[must_use]
    pub fn initiated_groups(&self) -> Vec<String> {
        self.lock().initiated.clone()
    }

    /// Principal names present on `endpoint`, sorted.
    #[must_use]
    pub fn principals(&self, endpoint: &Endpoint) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .principals
            .get(endpoint)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Shards registered with the router at `endpoint`, in order.
    #[must_use]
    pub fn registered_shards(&self, endpoint: &Endpoint) -> Vec<String> {
        self.lock().shards.get(endpoint).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClusterState> {
        self.state.lock().expect("lock poisoned")
    }

    fn set_behavior(&self, group: &str, update: impl FnOnce(&mut GroupBehavior)) {
        update(self.lock().behaviors.entry(group.to_string()).or_default());
    }

    fn should_fail(&self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.lock().expect("lock poisoned").r#gen::<f64>() < probability
    }

    fn dispatch(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&Credentials>,
        command: &AdminCommand,
    ) -> Result<Document, CommandError> {
        let mut state = self.lock();

        if let Some(remaining) = state.unreachable.get_mut(endpoint) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CommandError::connectivity(format!(
                    "connection refused: {endpoint}"
                )));
            }
        }

        match command {
            AdminCommand::Ping if self.should_fail(self.faults.connect_failure_rate) => {
                return Err(CommandError::connectivity(format!(
                    "connection reset: {endpoint}"
                )));
            }
            AdminCommand::ReplicationStatus
                if self.should_fail(self.faults.status_failure_rate) =>
            {
                return Ok(failure(91, "ShutdownInProgress", "node is recovering"));
            }
            AdminCommand::CreatePrincipal(_)
                if self.should_fail(self.faults.create_timeout_rate) =>
            {
                return Ok(failure(50, "MaxTimeMSExpired", "operation exceeded time limit"));
            }
            _ => {}
        }

        let key = (endpoint.clone(), command.name());
        if let Some(reply) = state.scripted.get_mut(&key).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }
        if let Some(reply) = state.persistent.get(&key) {
            return Ok(reply.clone());
        }

        if state.secured.contains(endpoint) && requires_auth(command) {
            let has_principals = state.principals.get(endpoint).is_some_and(|p| !p.is_empty());
            let valid = credentials.is_some_and(|c| {
                state
                    .principals
                    .get(endpoint)
                    .and_then(|p| p.get(&c.user))
                    .is_some_and(|secret| *secret == c.secret)
            });
            if has_principals && !valid {
                return Ok(failure(13, "Unauthorized", "command requires authentication"));
            }
        }

        Ok(match command {
            AdminCommand::Ping => json!({"ok": 1}),
            AdminCommand::BuildInfo => self.build_info.clone(),
            AdminCommand::Initiate(group) => state.initiate(endpoint, group),
            AdminCommand::ReplicationStatus => state.status(endpoint),
            AdminCommand::CreatePrincipal(principal) => {
                let principals = state.principals.entry(endpoint.clone()).or_default();
                if principals.contains_key(&principal.name) {
                    failure(
                        51003,
                        "Location51003",
                        &format!("User \"{}@admin\" already exists", principal.name),
                    )
                } else {
                    principals.insert(principal.name.clone(), principal.secret.clone());
                    json!({"ok": 1})
                }
            }
            AdminCommand::Authenticate { user, secret } => {
                let matches = state
                    .principals
                    .get(endpoint)
                    .and_then(|p| p.get(user))
                    .is_some_and(|s| s == secret);
                if matches {
                    json!({"ok": 1, "user": user})
                } else {
                    failure(18, "AuthenticationFailed", "Authentication failed.")
                }
            }
            AdminCommand::AddShard(shard) => {
                let name = shard.to_string();
                state
                    .shards
                    .entry(endpoint.clone())
                    .or_default()
                    .push(name.clone());
                json!({"ok": 1, "shardAdded": name})
            }
        })
    }

    fn record(
        &self,
        endpoint: &Endpoint,
        command: &AdminCommand,
        authenticated: bool,
        result: &Result<Document, CommandError>,
    ) {
        self.operations
            .lock()
            .expect("lock poisoned")
            .push(RecordedCommand {
                timestamp: self.clock.now(),
                elapsed: self.clock.elapsed(),
                endpoint: endpoint.clone(),
                command: command.name(),
                authenticated,
                success: result.as_ref().is_ok_and(reply_ok),
            });
    }
}

impl Default for SimulatedCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminTransport for SimulatedCluster {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&Credentials>,
        command: &AdminCommand,
    ) -> Result<Document, CommandError> {
        let result = self.dispatch(endpoint, credentials, command);
        self.record(endpoint, command, credentials.is_some(), &result);
        result
    }
}

impl ClusterState {
    fn initiate(&mut self, endpoint: &Endpoint, group: &GroupConfig) -> Document {
        if self.groups.contains_key(endpoint) {
            return failure(23, "AlreadyInitialized", "already initialized");
        }
        self.groups.insert(
            endpoint.clone(),
            GroupState {
                config: group.clone(),
                polls: 0,
            },
        );
        self.initiated.push(group.id.clone());
        json!({"ok": 1})
    }

    fn status(&mut self, endpoint: &Endpoint) -> Document {
        let Some(group) = self.groups.get_mut(endpoint) else {
            return failure(94, "NotYetInitialized", "no replset config has been received");
        };
        group.polls += 1;

        let behavior = self
            .behaviors
            .get(&group.config.id)
            .copied()
            .unwrap_or_default();
        let healthy = behavior
            .healthy_from_poll
            .is_some_and(|from| group.polls >= from);
        let total = group.config.members.len();
        let down_from = total.saturating_sub(behavior.short_by);

        let members: Vec<Value> = group
            .config
            .members
            .iter()
            .enumerate()
            .map(|(index, member)| {
                let (health, state) = match (healthy, index) {
                    (false, _) => (1, 5),
                    (true, i) if i >= down_from => (0, 8),
                    (true, 0) => (1, 1),
                    (true, _) => (1, 2),
                };
                json!({
                    "_id": member.id,
                    "name": member.host.to_string(),
                    "health": health,
                    "state": state,
                })
            })
            .collect();

        json!({"ok": 1, "set": group.config.id, "members": members})
    }
}

fn requires_auth(command: &AdminCommand) -> bool {
    !matches!(
        command,
        AdminCommand::Ping | AdminCommand::BuildInfo | AdminCommand::Authenticate { .. }
    )
}

/// Builds a failure reply document.
#[must_use]
pub fn failure(code: i64, code_name: &str, message: &str) -> Document {
    json!({"ok": 0, "code": code, "codeName": code_name, "errmsg": message})
}
