//! Custom assertion helpers for bootstrap tests.

use crate::simulation::SimulatedCluster;

/// Asserts that every `later` command was sent after the last `earlier` one.
///
/// # Panics
///
/// Panics if a `later` command precedes an `earlier` command, or if either
/// command was never sent.
pub fn assert_strictly_after(cluster: &SimulatedCluster, later: &str, earlier: &str) {
    let ops = cluster.operations();
    let last_earlier = ops
        .iter()
        .rposition(|op| op.command == earlier)
        .unwrap_or_else(|| panic!("no {earlier} command was sent"));
    let first_later = ops
        .iter()
        .position(|op| op.command == later)
        .unwrap_or_else(|| panic!("no {later} command was sent"));
    assert!(
        first_later > last_earlier,
        "{later} at position {first_later} precedes {earlier} at position {last_earlier}"
    );
}

/// Asserts that `command` was sent exactly `expected` times.
///
/// # Panics
///
/// Panics on a count mismatch.
pub fn assert_command_count(cluster: &SimulatedCluster, command: &str, expected: usize) {
    let actual = cluster.count(command);
    assert_eq!(
        actual, expected,
        "expected {expected} {command} commands, found {actual}"
    );
}

/// Asserts that `command` was never sent.
///
/// # Panics
///
/// Panics if the command appears in the recording.
pub fn assert_never_sent(cluster: &SimulatedCluster, command: &str) {
    assert_command_count(cluster, command, 0);
}
