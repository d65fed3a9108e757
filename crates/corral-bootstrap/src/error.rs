//! Error types for the bootstrap sequence.

use corral_admin::CommandError;
use corral_core::Endpoint;

/// The result type used throughout corral-bootstrap.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit status for a successful bootstrap.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status when configuration or topology is unusable.
pub const EXIT_CONFIGURATION: i32 = 2;
/// Exit status when an endpoint never became reachable.
pub const EXIT_UNREACHABLE: i32 = 10;
/// Exit status when a group rejected initiation.
pub const EXIT_INITIATION: i32 = 11;
/// Exit status when replica groups did not converge in time.
pub const EXIT_CONVERGENCE_TIMEOUT: i32 = 12;

/// Fatal bootstrap failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An endpoint never accepted a connection.
    #[error("cannot connect to {endpoint} after {attempts} attempts: {source}")]
    Unreachable {
        /// The endpoint that stayed unreachable.
        endpoint: Endpoint,
        /// Attempts made.
        attempts: u32,
        /// The last connection failure.
        #[source]
        source: CommandError,
    },

    /// A group rejected its initiate command.
    #[error("initiating group {group} via {endpoint} failed: {source}")]
    Initiation {
        /// Group identifier.
        group: String,
        /// Seed endpoint the command was sent to.
        endpoint: Endpoint,
        /// The rejection.
        #[source]
        source: CommandError,
    },

    /// Replica groups did not converge before the deadline.
    #[error("replica groups didn't sync up properly: {healthy}/{target} healthy after {ticks} ticks")]
    ConvergenceTimeout {
        /// Healthy members at the last tick.
        healthy: usize,
        /// Declared members.
        target: usize,
        /// Ticks polled.
        ticks: u32,
    },

    /// An error from corral-core.
    #[error("core error: {0}")]
    Core(#[from] corral_core::Error),
}

impl Error {
    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } => EXIT_UNREACHABLE,
            Self::Initiation { .. } => EXIT_INITIATION,
            Self::ConvergenceTimeout { .. } => EXIT_CONVERGENCE_TIMEOUT,
            Self::Core(_) => EXIT_CONFIGURATION,
        }
    }
}
