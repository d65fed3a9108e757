//! Subcommand implementations.

pub mod bootstrap;
pub mod status;
pub mod topology;
