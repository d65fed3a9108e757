//! Administrative command vocabulary.

use corral_core::{GroupConfig, Principal, ShardRef};
use serde_json::{Value, json};

/// An administrative command understood by the target servers.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    /// Liveness check.
    Ping,
    /// Server version and build features.
    BuildInfo,
    /// One-time replica group initialization.
    Initiate(GroupConfig),
    /// Runtime replication status of the group the endpoint belongs to.
    ReplicationStatus,
    /// Creates a principal.
    CreatePrincipal(Principal),
    /// Authenticates the session as a principal.
    Authenticate {
        /// User name.
        user: String,
        /// Password.
        secret: String,
    },
    /// Registers a shard with a router.
    AddShard(ShardRef),
}

impl AdminCommand {
    /// Wire name of the command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::BuildInfo => "buildInfo",
            Self::Initiate(_) => "replSetInitiate",
            Self::ReplicationStatus => "replSetGetStatus",
            Self::CreatePrincipal(_) => "createUser",
            Self::Authenticate { .. } => "authenticate",
            Self::AddShard(_) => "addShard",
        }
    }

    /// Encodes the command as a JSON command document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        match self {
            Self::Ping | Self::BuildInfo | Self::ReplicationStatus => json!({ self.name(): 1 }),
            Self::Initiate(group) => {
                let mut config = json!({
                    "_id": group.id,
                    "members": group.members,
                    "settings": group.settings.to_json(),
                });
                if group.config_server {
                    config["configsvr"] = Value::Bool(true);
                }
                json!({ "replSetInitiate": config })
            }
            Self::CreatePrincipal(principal) => json!({
                "createUser": principal.name,
                "pwd": principal.secret,
                "roles": principal.roles,
            }),
            Self::Authenticate { user, secret } => json!({
                "authenticate": 1,
                "user": user,
                "pwd": secret,
            }),
            Self::AddShard(shard) => json!({ "addShard": shard.to_string() }),
        }
    }

    /// Authentication command for a principal.
    #[must_use]
    pub fn authenticate(principal: &Principal) -> Self {
        Self::Authenticate {
            user: principal.name.clone(),
            secret: principal.secret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use corral_core::{Endpoint, GroupSettings, Topology};

    #[test]
    fn test_initiate_carries_full_member_list() {
        let topology = Topology::default();
        let rs1 = topology.replica_group("rs1").unwrap().clone();
        let doc = AdminCommand::Initiate(rs1).to_document();

        let config = &doc["replSetInitiate"];
        assert_eq!(config["_id"], "rs1");
        assert_eq!(config["members"].as_array().unwrap().len(), 3);
        assert_eq!(config["members"][0]["host"], "127.0.0.1:40011");
        assert_eq!(config["members"][1]["priority"], 0);
        assert_eq!(config["members"][2]["tags"]["rs1"], "c");
        assert_eq!(config["settings"], json!({}));
        assert!(config.get("configsvr").is_none());
    }

    #[test]
    fn test_initiate_passes_settings_through() {
        let topology = Topology::default();
        let settings = GroupSettings::new(BTreeMap::from([
            ("chainingAllowed".to_string(), json!(false)),
            ("heartbeatTimeoutSecs".to_string(), json!(5)),
        ]));
        let rs2 = topology
            .replica_group("rs2")
            .unwrap()
            .clone()
            .with_settings(settings);

        let doc = AdminCommand::Initiate(rs2).to_document();
        assert_eq!(
            doc["replSetInitiate"]["settings"],
            json!({"chainingAllowed": false, "heartbeatTimeoutSecs": 5})
        );
    }

    #[test]
    fn test_initiate_marks_config_layer() {
        let topology = Topology::default();
        let conf1 = topology.config_groups[0].clone();
        let doc = AdminCommand::Initiate(conf1).to_document();
        assert_eq!(doc["replSetInitiate"]["configsvr"], true);
        assert_eq!(doc["replSetInitiate"]["members"][0]["host"], "localhost:40101");
        assert!(doc["replSetInitiate"].get("seed").is_none());
    }

    #[test]
    fn test_principal_and_shard_documents() {
        let principal = Principal::new("reader", "pw", &["readAnyDatabase"]);
        let doc = AdminCommand::CreatePrincipal(principal.clone()).to_document();
        assert_eq!(doc, json!({"createUser": "reader", "pwd": "pw", "roles": ["readAnyDatabase"]}));

        let doc = AdminCommand::authenticate(&principal).to_document();
        assert_eq!(doc["user"], "reader");

        let shard = ShardRef::Replicated {
            group: "rs2".to_string(),
            seed: Endpoint::loopback(40021),
        };
        let doc = AdminCommand::AddShard(shard).to_document();
        assert_eq!(doc, json!({"addShard": "rs2/127.0.0.1:40021"}));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(AdminCommand::Ping.to_document(), json!({"ping": 1}));
        assert_eq!(
            AdminCommand::ReplicationStatus.to_document(),
            json!({"replSetGetStatus": 1})
        );
        assert_eq!(AdminCommand::BuildInfo.name(), "buildInfo");
    }
}
