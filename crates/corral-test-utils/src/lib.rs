//! Shared test utilities for corral.
//!
//! This crate provides:
//! - [`SimulatedClock`]: a [`corral_core::Clock`] that advances instantly
//!   and records every wait
//! - [`SimulatedCluster`]: an in-memory [`corral_admin::AdminTransport`]
//!   modelling endpoints, groups, principals, and routers
//! - Topology fixtures and assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use corral_test_utils::{SimulatedCluster, fixtures};
//!
//! let cluster = SimulatedCluster::new().converge_after("rs1", 6);
//! let topology = fixtures::single_group_topology();
//! // ... run a bootstrapper against cluster.transport() ...
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities panic on poisoned locks and broken fixtures
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod simulation;

pub use assertions::*;
pub use simulation::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("corral=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
