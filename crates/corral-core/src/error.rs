//! Error types and result aliases for corral.
//!
//! This module defines the error type shared by the topology model and the
//! configuration layer. Orchestration failures live in `corral-bootstrap`.

/// The result type used throughout corral-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while declaring or loading a topology.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An endpoint string could not be parsed as `host:port`.
    #[error("invalid endpoint '{input}': {message}")]
    InvalidEndpoint {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        message: String,
    },

    /// A shard reference could not be parsed.
    #[error("invalid shard reference '{input}': {message}")]
    InvalidShardRef {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        message: String,
    },

    /// The declared topology violates an invariant.
    #[error("invalid topology: {message}")]
    InvalidTopology {
        /// Description of the violation.
        message: String,
    },

    /// A configuration value was present but unusable.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },
}

impl Error {
    /// Creates a new topology validation error.
    #[must_use]
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
