//! Declared cluster topology.
//!
//! A [`Topology`] is resolved once before bootstrap starts and is read-only
//! afterwards. It names every endpoint the orchestrator talks to, the replica
//! groups to initiate, the principals to create, and the shards to register.
//!
//! Topology files are JSON and use the same field names the initiate command
//! carries on the wire (`_id`, `host`, `priority`, `tags`, `configsvr`).

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::version::VersionTuple;

/// Group settings passed verbatim to the initiate command.
///
/// Each group owns its own copy; settings are never shared between groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSettings(BTreeMap<String, serde_json::Value>);

impl GroupSettings {
    /// Creates settings from key/value pairs.
    #[must_use]
    pub fn new(entries: BTreeMap<String, serde_json::Value>) -> Self {
        Self(entries)
    }

    /// Returns true if no settings are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the settings as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.clone().into_iter().collect())
    }
}

fn default_priority() -> u32 {
    1
}

/// One server's role inside a replica group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member identifier, unique within the group.
    #[serde(rename = "_id")]
    pub id: u32,
    /// Address the member is known by inside the group.
    pub host: Endpoint,
    /// Election priority. Zero means the member never becomes primary.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Opaque tags, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Member {
    /// Creates a member with default priority and no tags.
    #[must_use]
    pub fn new(id: u32, host: Endpoint) -> Self {
        Self {
            id,
            host,
            priority: default_priority(),
            tags: BTreeMap::new(),
        }
    }

    /// Sets the election priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Returns true if this member may be elected primary.
    #[must_use]
    pub const fn electable(&self) -> bool {
        self.priority > 0
    }
}

/// Declared configuration of one replica group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Whether this group belongs to the config layer.
    #[serde(rename = "configsvr", default, skip_serializing_if = "std::ops::Not::not")]
    pub config_server: bool,
    /// Ordered member list. Exactly these members count toward convergence.
    pub members: Vec<Member>,
    /// Settings sent with the initiate command.
    #[serde(default, skip_serializing_if = "GroupSettings::is_empty")]
    pub settings: GroupSettings,
    /// Endpoint used to reach the group, when it differs from the first member's host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Endpoint>,
}

impl GroupConfig {
    /// Creates a replica group with no settings.
    #[must_use]
    pub fn new(id: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            id: id.into(),
            config_server: false,
            members,
            settings: GroupSettings::default(),
            seed: None,
        }
    }

    /// Marks the group as a config-layer group.
    #[must_use]
    pub fn config_layer(mut self) -> Self {
        self.config_server = true;
        self
    }

    /// Sets an explicit seed endpoint.
    #[must_use]
    pub fn with_seed(mut self, seed: Endpoint) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replaces the group settings.
    #[must_use]
    pub fn with_settings(mut self, settings: GroupSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the endpoint the initiate and status commands are sent to.
    ///
    /// # Errors
    ///
    /// Returns an error if the group declares no seed and has no members.
    pub fn seed(&self) -> Result<&Endpoint> {
        self.seed
            .as_ref()
            .or_else(|| self.members.first().map(|m| &m.host))
            .ok_or_else(|| Error::invalid_topology(format!("group {} has no members", self.id)))
    }

    /// Number of declared members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns true if `name` is the host of a declared member.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.host.to_string() == name)
    }

    /// Validates group invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the group is empty, has duplicate member ids or
    /// hosts, or has no member that can be elected primary.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid_topology("group id must not be empty"));
        }
        if self.members.is_empty() {
            return Err(Error::invalid_topology(format!(
                "group {} declares no members",
                self.id
            )));
        }

        let mut ids = HashSet::new();
        let mut hosts = HashSet::new();
        for member in &self.members {
            if !ids.insert(member.id) {
                return Err(Error::invalid_topology(format!(
                    "group {} declares member id {} twice",
                    self.id, member.id
                )));
            }
            if !hosts.insert(&member.host) {
                return Err(Error::invalid_topology(format!(
                    "group {} declares host {} twice",
                    self.id, member.host
                )));
            }
        }

        if !self.members.iter().any(Member::electable) {
            return Err(Error::invalid_topology(format!(
                "group {} has no member with non-zero priority",
                self.id
            )));
        }

        Ok(())
    }
}

/// A credential record to create on an endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User name.
    pub name: String,
    /// Password.
    pub secret: String,
    /// Granted roles.
    pub roles: Vec<String>,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(name: impl Into<String>, secret: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .field("roles", &self.roles)
            .finish()
    }
}

/// A shard target: a bare endpoint or a replica group addressed through one member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShardRef {
    /// A standalone server.
    Standalone(Endpoint),
    /// A replica group, written `groupId/host:port`.
    Replicated {
        /// Replica group identifier.
        group: String,
        /// Member used to discover the group.
        seed: Endpoint,
    },
}

impl ShardRef {
    /// Returns the endpoint named by this reference.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Self::Standalone(endpoint) | Self::Replicated { seed: endpoint, .. } => endpoint,
        }
    }
}

impl fmt::Display for ShardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone(endpoint) => write!(f, "{endpoint}"),
            Self::Replicated { group, seed } => write!(f, "{group}/{seed}"),
        }
    }
}

impl FromStr for ShardRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            None => Ok(Self::Standalone(s.parse()?)),
            Some((group, rest)) => {
                if group.is_empty() {
                    return Err(Error::InvalidShardRef {
                        input: s.to_string(),
                        message: "missing group id before '/'".to_string(),
                    });
                }
                let seed = rest.parse().map_err(|e: Error| Error::InvalidShardRef {
                    input: s.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Self::Replicated {
                    group: group.to_string(),
                    seed,
                })
            }
        }
    }
}

impl TryFrom<String> for ShardRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ShardRef> for String {
    fn from(shard: ShardRef) -> Self {
        shard.to_string()
    }
}

/// Where credentials are provisioned and with which principals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPlan {
    /// Entry points that receive the principals, in order.
    pub endpoints: Vec<Endpoint>,
    /// Entry points provisioned only when the probed server supports TLS.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls_endpoints: Vec<Endpoint>,
    /// Privileged administrative principal.
    pub admin: Principal,
    /// Reduced-privilege read-only principal.
    pub reader: Principal,
}

impl AuthPlan {
    /// Returns the endpoints to provision given the probed TLS capability.
    #[must_use]
    pub fn targets(&self, tls_enabled: bool) -> Vec<Endpoint> {
        let mut targets = self.endpoints.clone();
        if tls_enabled {
            targets.extend(self.tls_endpoints.iter().cloned());
        }
        targets
    }
}

/// One routing endpoint and the shards to register with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterPlan {
    /// Router address.
    pub endpoint: Endpoint,
    /// Whether the router only accepts registrations after authenticating.
    #[serde(default)]
    pub requires_auth: bool,
    /// Shards to register, in order.
    pub shards: Vec<ShardRef>,
}

fn default_config_layer_min_version() -> VersionTuple {
    VersionTuple::new([3, 4])
}

/// The complete declared topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// Endpoint whose build information gates optional behavior.
    pub probe: Endpoint,
    /// Config-layer groups.
    #[serde(default)]
    pub config_groups: Vec<GroupConfig>,
    /// Minimum server version at which config-layer groups are initiated explicitly.
    #[serde(default = "default_config_layer_min_version")]
    pub config_layer_min_version: VersionTuple,
    /// Data-bearing replica groups.
    pub replica_groups: Vec<GroupConfig>,
    /// Credential provisioning plan.
    pub auth: AuthPlan,
    /// Routers and their shard registrations.
    #[serde(default)]
    pub routers: Vec<RouterPlan>,
}

impl Topology {
    /// Parses a topology from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the topology is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let topology: Self = serde_json::from_str(json)?;
        topology.validate()?;
        Ok(topology)
    }

    /// Reads and validates a topology file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a valid topology.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read topology {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Sum of declared members across replica groups.
    ///
    /// The poller compares the live healthy count against this value.
    #[must_use]
    pub fn convergence_target(&self) -> usize {
        self.replica_groups.iter().map(GroupConfig::member_count).sum()
    }

    /// Returns every group, config layer first.
    pub fn groups(&self) -> impl Iterator<Item = &GroupConfig> {
        self.config_groups.iter().chain(self.replica_groups.iter())
    }

    /// Looks up a replica group by id.
    #[must_use]
    pub fn replica_group(&self, id: &str) -> Option<&GroupConfig> {
        self.replica_groups.iter().find(|g| g.id == id)
    }

    /// Endpoints that must be reachable before bootstrap starts.
    ///
    /// The probe endpoint comes first, then replica seeds, then config seeds.
    /// Duplicates are removed while preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if a group has no seed.
    pub fn fixed_endpoints(&self) -> Result<Vec<Endpoint>> {
        let mut seen = HashSet::new();
        let mut endpoints = Vec::new();
        let mut push = |endpoint: &Endpoint| {
            if seen.insert(endpoint.clone()) {
                endpoints.push(endpoint.clone());
            }
        };

        push(&self.probe);
        for group in &self.replica_groups {
            push(group.seed()?);
        }
        for group in &self.config_groups {
            push(group.seed()?);
        }
        Ok(endpoints)
    }

    /// Validates topology invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if a group is invalid, group ids collide, or a shard
    /// reference names an unknown group or a host outside that group.
    pub fn validate(&self) -> Result<()> {
        if self.replica_groups.is_empty() {
            return Err(Error::invalid_topology("at least one replica group is required"));
        }

        let mut ids = HashSet::new();
        for group in self.groups() {
            group.validate()?;
            if !ids.insert(group.id.as_str()) {
                return Err(Error::invalid_topology(format!(
                    "group id {} is declared twice",
                    group.id
                )));
            }
        }

        if let Some(group) = self.replica_groups.iter().find(|g| g.config_server) {
            return Err(Error::invalid_topology(format!(
                "replica group {} is flagged as a config server",
                group.id
            )));
        }

        for router in &self.routers {
            for shard in &router.shards {
                if let ShardRef::Replicated { group, seed } = shard {
                    let declared = self.replica_group(group).ok_or_else(|| {
                        Error::invalid_topology(format!(
                            "shard {shard} on router {} names unknown group {group}",
                            router.endpoint
                        ))
                    })?;
                    if !declared.declares(&seed.to_string()) {
                        return Err(Error::invalid_topology(format!(
                            "shard {shard} names {seed}, which is not a member of {group}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Builds a three-member group on consecutive loopback ports.
fn replica_group(id: &str, base_port: u16, priorities: [u32; 3]) -> GroupConfig {
    let members = priorities
        .iter()
        .zip(1u16..)
        .zip(["a", "b", "c"])
        .map(|((priority, offset), tag)| {
            Member::new(u32::from(offset), Endpoint::loopback(base_port + offset))
                .with_priority(*priority)
                .with_tag(id, tag)
        })
        .collect();
    GroupConfig::new(id, members)
}

fn config_group(id: &str, port: u16) -> GroupConfig {
    GroupConfig::new(id, vec![Member::new(1, Endpoint::new("localhost", port))])
        .config_layer()
        .with_seed(Endpoint::loopback(port))
}

impl Default for Topology {
    /// The built-in local test cluster: a standalone shard on 40001, replica
    /// groups `rs1`..`rs3` on 4001x..4003x, config servers on 40101..40103,
    /// and routers on 40201..40203.
    fn default() -> Self {
        let root = Principal::new("root", "rapadura", &["root"]);
        let reader = Principal::new("reader", "rapadura", &["readAnyDatabase"]);

        Self {
            probe: Endpoint::loopback(40001),
            config_groups: vec![
                config_group("conf1", 40101),
                config_group("conf2", 40102),
                config_group("conf3", 40103),
            ],
            config_layer_min_version: default_config_layer_min_version(),
            replica_groups: vec![
                replica_group("rs1", 40010, [1, 0, 0]),
                replica_group("rs2", 40020, [1, 1, 1]),
                replica_group("rs3", 40030, [1, 0, 0]),
            ],
            auth: AuthPlan {
                endpoints: vec![
                    Endpoint::loopback(40002),
                    Endpoint::loopback(40203),
                    Endpoint::loopback(40031),
                ],
                tls_endpoints: vec![Endpoint::loopback(40003)],
                admin: root,
                reader,
            },
            routers: vec![
                RouterPlan {
                    endpoint: Endpoint::loopback(40201),
                    requires_auth: false,
                    shards: vec![
                        ShardRef::Standalone(Endpoint::loopback(40001)),
                        ShardRef::Replicated {
                            group: "rs1".to_string(),
                            seed: Endpoint::loopback(40011),
                        },
                    ],
                },
                RouterPlan {
                    endpoint: Endpoint::loopback(40202),
                    requires_auth: false,
                    shards: vec![ShardRef::Replicated {
                        group: "rs2".to_string(),
                        seed: Endpoint::loopback(40021),
                    }],
                },
                RouterPlan {
                    endpoint: Endpoint::loopback(40203),
                    requires_auth: true,
                    shards: vec![ShardRef::Replicated {
                        group: "rs3".to_string(),
                        seed: Endpoint::loopback(40031),
                    }],
                },
            ],
        }
    }
}
