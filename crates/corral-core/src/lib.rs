//! # corral-core
//!
//! Core abstractions for the corral cluster bootstrap orchestrator.
//!
//! This crate provides the declared-topology model and the primitives every
//! other corral crate builds on:
//!
//! - **Topology**: endpoints, replica groups, members, principals and shard references
//! - **Versions**: numeric version tuples used to gate optional behavior
//! - **Health**: per-poll member status samples and the healthy-count rule
//! - **Clock**: the sleep abstraction every retry loop waits through
//! - **Policy**: retry ceilings and delays, overridable from the environment
//! - **Error Types**: shared error definitions and result types
//!
//! ## Example
//!
//! ```rust
//! use corral_core::prelude::*;
//!
//! let topology = Topology::default();
//! topology.validate().unwrap();
//! assert_eq!(topology.convergence_target(), 9);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod endpoint;
pub mod error;
pub mod health;
pub mod observability;
pub mod policy;
pub mod topology;
pub mod version;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use corral_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{Clock, TokioClock};
    pub use crate::endpoint::Endpoint;
    pub use crate::error::{Error, Result};
    pub use crate::health::{GroupHealth, HealthSample, MemberRole, MemberStatus};
    pub use crate::policy::BootstrapPolicy;
    pub use crate::topology::{
        AuthPlan, GroupConfig, GroupSettings, Member, Principal, RouterPlan, ShardRef, Topology,
    };
    pub use crate::version::VersionTuple;
}

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, TokioClock};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use health::{ConvergenceState, GroupHealth, HealthSample, MemberRole, MemberStatus};
pub use observability::{LogFormat, init_logging};
pub use policy::BootstrapPolicy;
pub use topology::{
    AuthPlan, GroupConfig, GroupSettings, Member, Principal, RouterPlan, ShardRef, Topology,
};
pub use version::VersionTuple;
