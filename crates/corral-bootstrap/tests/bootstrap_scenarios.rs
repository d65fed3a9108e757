//! End-to-end bootstrap scenarios against a simulated cluster.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use corral_bootstrap::error::{EXIT_CONVERGENCE_TIMEOUT, EXIT_INITIATION, EXIT_UNREACHABLE};
use corral_bootstrap::{Bootstrapper, CreateOutcome, Error};
use corral_core::{Endpoint, Topology};
use corral_test_utils::simulation::failure;
use corral_test_utils::{
    FaultConfig, SimulatedCluster, assert_command_count, assert_never_sent, assert_strictly_after,
    fixtures, init_test_logging,
};

fn bootstrapper(topology: Topology, cluster: &Arc<SimulatedCluster>) -> Bootstrapper {
    Bootstrapper::new(topology, cluster.clone(), cluster.clock(), fixtures::policy())
}

fn seed() -> Endpoint {
    Endpoint::loopback(40011)
}

#[tokio::test]
async fn converges_on_sixth_poll_then_provisions_and_registers() {
    init_test_logging();
    let cluster = SimulatedCluster::new().converge_after("rs1", 6).shared();

    let report = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    assert_eq!(report.convergence.tick, 5);
    assert_eq!(report.convergence.healthy, 3);
    assert_command_count(&cluster, "replSetGetStatus", 6);
    assert_strictly_after(&cluster, "createUser", "replSetGetStatus");
    assert_strictly_after(&cluster, "addShard", "createUser");

    assert!(report.provisioning.fully_provisioned());
    assert_eq!(cluster.principals(&seed()), vec!["reader", "root"]);
    assert_eq!(
        cluster.registered_shards(&Endpoint::loopback(40201)),
        vec!["rs1/127.0.0.1:40011"]
    );

    let clock = cluster.clock();
    assert_eq!(clock.sleeps_of(Duration::from_secs(1)), 5);
    // settle 3s, five 1s poll waits, reader pause, endpoint settle 3s, final settle 2s
    assert_eq!(clock.elapsed(), Duration::from_millis(13_500));
}

#[tokio::test]
async fn staggered_groups_converge_when_the_slowest_does() {
    let cluster = SimulatedCluster::new()
        .converge_after("rs1", 2)
        .converge_after("rs2", 6)
        .converge_after("rs3", 4)
        .shared();

    let report = bootstrapper(fixtures::local_cluster(), &cluster)
        .run()
        .await
        .unwrap();

    assert_eq!(report.convergence.tick, 5);
    assert_eq!(report.convergence.healthy, 9);
    assert_eq!(report.convergence.target, 9);
    assert_command_count(&cluster, "replSetGetStatus", 18);
    assert_strictly_after(&cluster, "createUser", "replSetGetStatus");
    assert_strictly_after(&cluster, "addShard", "createUser");
    assert_eq!(cluster.clock().sleeps_of(Duration::from_secs(1)), 5);
}

#[tokio::test]
async fn permanently_short_group_times_out() {
    let cluster = SimulatedCluster::new().short_by("rs1", 1).shared();

    let err = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap_err();

    match &err {
        Error::ConvergenceTimeout {
            healthy,
            target,
            ticks,
        } => {
            assert_eq!((*healthy, *target, *ticks), (2, 3, 60));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), EXIT_CONVERGENCE_TIMEOUT);
    assert_command_count(&cluster, "replSetGetStatus", 60);
    assert_never_sent(&cluster, "createUser");
    assert_never_sent(&cluster, "addShard");
}

#[tokio::test]
async fn group_without_primary_never_converges() {
    let cluster = SimulatedCluster::new().never_converge("rs1").shared();

    let err = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConvergenceTimeout { healthy: 0, .. }));
}

#[tokio::test]
async fn creation_timeout_enables_auth_retries() {
    let cluster = SimulatedCluster::new()
        .script(
            &seed(),
            "createUser",
            failure(50, "MaxTimeMSExpired", "operation exceeded time limit"),
        )
        .script(
            &seed(),
            "authenticate",
            failure(18, "AuthenticationFailed", "Authentication failed."),
        )
        .shared();

    let report = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    let endpoint = &report.provisioning.endpoints[0];
    assert_eq!(endpoint.admin, CreateOutcome::Created);
    assert_eq!(endpoint.create_attempts, 2);
    assert!(endpoint.timed_out);
    assert!(endpoint.authenticated);
    assert_eq!(endpoint.auth_attempts, 2);
    assert_command_count(&cluster, "authenticate", 2);
}

#[tokio::test]
async fn persistent_write_timeouts_retry_auth_to_the_ceiling() {
    let cluster = SimulatedCluster::new()
        .with_faults(FaultConfig::slow_writes(1.0))
        .shared();

    let report = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    let endpoint = &report.provisioning.endpoints[0];
    assert!(matches!(endpoint.admin, CreateOutcome::Failed(_)));
    assert_eq!(endpoint.create_attempts, 60);
    assert!(endpoint.timed_out);
    assert!(!endpoint.authenticated);
    assert_eq!(endpoint.auth_attempts, 60);
    assert!(!endpoint.reader.is_success());
    assert_command_count(&cluster, "createUser", 61);
    assert_command_count(&cluster, "authenticate", 60);
    assert!(cluster.principals(&seed()).is_empty());
    assert_eq!(report.registration.registered().count(), 1);
}

#[tokio::test]
async fn auth_failure_without_timeout_is_not_retried() {
    let cluster = SimulatedCluster::new()
        .script(
            &seed(),
            "authenticate",
            failure(18, "AuthenticationFailed", "Authentication failed."),
        )
        .shared();

    let report = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    let endpoint = &report.provisioning.endpoints[0];
    assert!(!endpoint.timed_out);
    assert!(!endpoint.authenticated);
    assert_eq!(endpoint.auth_attempts, 1);
    assert_eq!(endpoint.reader, CreateOutcome::Created);
    assert_command_count(&cluster, "authenticate", 1);
}

#[tokio::test]
async fn existing_principal_counts_as_success() {
    let cluster = SimulatedCluster::new()
        .script(
            &seed(),
            "createUser",
            failure(51003, "Location51003", "User \"root@admin\" already exists"),
        )
        .shared();

    let report = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    let endpoint = &report.provisioning.endpoints[0];
    assert_eq!(endpoint.admin, CreateOutcome::AlreadyExists);
    assert_eq!(endpoint.create_attempts, 1);
}

#[tokio::test]
async fn transient_security_errors_pause_and_retry() {
    let key_not_found = failure(211, "KeyNotFound", "no keys found for HMAC that is valid");
    let cluster = SimulatedCluster::new()
        .script(&seed(), "createUser", key_not_found.clone())
        .script(&seed(), "createUser", key_not_found)
        .shared();

    let report = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    assert_eq!(report.provisioning.endpoints[0].create_attempts, 3);
    // two transient pauses plus the reader pause
    assert_eq!(cluster.clock().sleeps_of(Duration::from_millis(500)), 3);
}

#[tokio::test]
async fn failing_shard_stops_after_ten_attempts() {
    let router = Endpoint::loopback(40201);
    let cluster = SimulatedCluster::new()
        .always(&router, "addShard", failure(96, "OperationFailed", "can't add shard"))
        .shared();

    let report = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    let outcome = &report.registration.outcomes[0];
    assert!(!outcome.registered);
    assert_eq!(outcome.attempts, 10);
    assert!(outcome.last_error.as_deref().unwrap().contains("can't add shard"));
    assert_command_count(&cluster, "addShard", 10);
    assert_eq!(report.registration.failed().count(), 1);
}

#[tokio::test]
async fn config_layer_initiated_on_modern_servers() {
    let cluster = SimulatedCluster::new().shared();

    let report = bootstrapper(fixtures::local_cluster(), &cluster)
        .run()
        .await
        .unwrap();

    assert!(report.config_layer_initiated);
    assert_eq!(
        cluster.initiated_groups(),
        vec!["conf1", "conf2", "conf3", "rs1", "rs2", "rs3"]
    );
    assert_eq!(report.convergence.target, 9);
    assert_eq!(report.registration.registered().count(), 4);
}

#[tokio::test]
async fn config_layer_skipped_on_old_servers() {
    let cluster = SimulatedCluster::new().with_version("3.2.12").shared();

    let report = bootstrapper(fixtures::local_cluster(), &cluster)
        .run()
        .await
        .unwrap();

    assert!(!report.config_layer_initiated);
    assert_eq!(cluster.initiated_groups(), vec!["rs1", "rs2", "rs3"]);
}

#[tokio::test]
async fn tls_endpoint_provisioned_only_with_tls_support() {
    let tls = Endpoint::loopback(40003);

    let plain = SimulatedCluster::new().shared();
    bootstrapper(fixtures::local_cluster(), &plain)
        .run()
        .await
        .unwrap();
    assert!(plain.principals(&tls).is_empty());

    let secure = SimulatedCluster::new().with_tls().shared();
    let report = bootstrapper(fixtures::local_cluster(), &secure)
        .run()
        .await
        .unwrap();
    assert!(report.capabilities.tls_enabled);
    assert_eq!(report.provisioning.endpoints.len(), 4);
    assert_eq!(secure.principals(&tls), vec!["reader", "root"]);
}

#[tokio::test]
async fn secured_router_registers_after_authenticating() {
    let router = Endpoint::loopback(40203);
    let cluster = SimulatedCluster::new().secured(router.clone()).shared();

    bootstrapper(fixtures::local_cluster(), &cluster)
        .run()
        .await
        .unwrap();

    assert_eq!(cluster.registered_shards(&router), vec!["rs3/127.0.0.1:40031"]);
    let add_shard =
        cluster.operations_where(|op| op.endpoint == router && op.command == "addShard");
    assert!(add_shard.iter().all(|op| op.authenticated && op.success));
}

#[tokio::test]
async fn connection_retried_until_endpoint_listens() {
    let cluster = SimulatedCluster::new().unreachable_for(seed(), 3).shared();

    bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap();

    assert_eq!(cluster.count_at(&seed(), "ping"), 5);
    assert_eq!(cluster.clock().sleeps_of(Duration::from_secs(1)), 3);
}

#[tokio::test]
async fn unreachable_endpoint_is_fatal() {
    let cluster = SimulatedCluster::new().unreachable_for(seed(), 1_000).shared();

    let err = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unreachable { attempts: 60, .. }));
    assert_eq!(err.exit_code(), EXIT_UNREACHABLE);
    assert_never_sent(&cluster, "replSetInitiate");
}

#[tokio::test]
async fn rejected_initiation_is_fatal() {
    let cluster = SimulatedCluster::new()
        .script(
            &seed(),
            "replSetInitiate",
            failure(23, "AlreadyInitialized", "already initialized"),
        )
        .shared();

    let err = bootstrapper(fixtures::single_group_topology(), &cluster)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Initiation { ref group, .. } if group == "rs1"));
    assert_eq!(err.exit_code(), EXIT_INITIATION);
    assert_never_sent(&cluster, "replSetGetStatus");
}

#[tokio::test]
async fn flaky_cluster_still_bootstraps_deterministically() {
    let run = |seed| async move {
        let cluster = SimulatedCluster::with_seed(seed)
            .with_faults(FaultConfig::flaky_network())
            .shared();
        bootstrapper(fixtures::local_cluster(), &cluster)
            .run()
            .await
            .unwrap();
        cluster.operations().len()
    };

    assert_eq!(run(7).await, run(7).await);
}

#[tokio::test]
async fn seeded_write_timeouts_are_reproducible() {
    let run = |seed| async move {
        let cluster = SimulatedCluster::with_seed(seed)
            .with_faults(FaultConfig::slow_writes(0.5))
            .shared();
        let report = bootstrapper(fixtures::local_cluster(), &cluster)
            .run()
            .await
            .unwrap();
        let attempts: Vec<_> = report
            .provisioning
            .endpoints
            .iter()
            .map(|e| (e.create_attempts, e.timed_out, e.authenticated))
            .collect();
        (attempts, cluster.count("createUser"))
    };

    assert_eq!(run(3).await, run(3).await);
}
