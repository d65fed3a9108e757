//! # corral-bootstrap
//!
//! Brings a declared topology from bare server endpoints to one converged,
//! authenticated, sharded cluster.
//!
//! ## Phases
//!
//! The [`Bootstrapper`] drives the components strictly in order, each phase's
//! postcondition being the next one's precondition:
//!
//! 1. [`connector`]: open a session to every fixed endpoint, retrying while
//!    servers are still starting
//! 2. [`probe`]: read the server version and TLS support
//! 3. [`initiator`]: initiate config-layer groups (version-gated), settle,
//!    then initiate every replica group
//! 4. [`poller`]: poll until every declared member is healthy under an
//!    elected primary, or the deadline passes
//! 5. [`provisioner`]: create the admin and read-only principals
//! 6. [`registrar`]: register shards with each router
//!
//! Everything runs on one logical thread of control. Waits go through the
//! injected [`corral_core::Clock`].
//!
//! ## Failure
//!
//! Unreachable endpoints, rejected initiation, and convergence timeouts are
//! fatal and map to distinct exit codes via [`Error::exit_code`]. Credential
//! and shard registration problems are logged and reported, never fatal.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod connector;
pub mod error;
pub mod initiator;
pub mod poller;
pub mod probe;
pub mod provisioner;
pub mod registrar;
pub mod sequencer;

pub use connector::Connector;
pub use error::{Error, Result};
pub use poller::{ConvergencePoller, ConvergenceReport, GroupProbe};
pub use probe::Capabilities;
pub use provisioner::{CreateOutcome, CredentialProvisioner, EndpointProvision, ProvisionReport};
pub use registrar::{RegistrationReport, ShardOutcome, ShardRegistrar};
pub use sequencer::{BootstrapReport, Bootstrapper};
