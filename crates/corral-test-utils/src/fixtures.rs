//! Pre-built topologies and principals for bootstrap tests.

use corral_core::{
    AuthPlan, BootstrapPolicy, Endpoint, GroupConfig, Member, Principal, RouterPlan, ShardRef,
    Topology, VersionTuple,
};

/// Administrative principal used by the fixtures.
#[must_use]
pub fn admin() -> Principal {
    Principal::new("root", "rapadura", &["root"])
}

/// Read-only principal used by the fixtures.
#[must_use]
pub fn reader() -> Principal {
    Principal::new("reader", "rapadura", &["readAnyDatabase"])
}

/// The built-in local cluster layout.
#[must_use]
pub fn local_cluster() -> Topology {
    Topology::default()
}

/// Three-member group `id` on `base_port + 1 ..= base_port + 3`.
#[must_use]
pub fn three_member_group(id: &str, base_port: u16) -> GroupConfig {
    GroupConfig::new(
        id,
        (1..=3u16)
            .map(|offset| Member::new(u32::from(offset), Endpoint::loopback(base_port + offset)))
            .collect(),
    )
}

/// One replica group `rs1` on 40011..40013, one auth endpoint on its seed,
/// and one router on 40201 fronting it.
#[must_use]
pub fn single_group_topology() -> Topology {
    let group = three_member_group("rs1", 40010);
    let seed = Endpoint::loopback(40011);

    Topology {
        probe: seed.clone(),
        config_groups: Vec::new(),
        config_layer_min_version: VersionTuple::new([3, 4]),
        replica_groups: vec![group],
        auth: AuthPlan {
            endpoints: vec![seed.clone()],
            tls_endpoints: Vec::new(),
            admin: admin(),
            reader: reader(),
        },
        routers: vec![RouterPlan {
            endpoint: Endpoint::loopback(40201),
            requires_auth: false,
            shards: vec![ShardRef::Replicated {
                group: "rs1".to_string(),
                seed,
            }],
        }],
    }
}

/// The default timing policy.
///
/// Under a simulated clock the real intervals cost nothing, and asserting
/// against them keeps tests honest about the production schedule.
#[must_use]
pub fn policy() -> BootstrapPolicy {
    BootstrapPolicy::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_validate() {
        single_group_topology().validate().unwrap();
        local_cluster().validate().unwrap();
        assert_eq!(single_group_topology().convergence_target(), 3);
    }
}
