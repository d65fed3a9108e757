//! Logging setup and span helpers.
//!
//! Progress output is structured `tracing` events; the subscriber decides
//! whether they render for humans or as JSON.

use std::sync::Once;

use serde::Deserialize;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logs.
    Json,
    /// Human-readable logs.
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at startup; later calls are no-ops. `RUST_LOG` controls levels
/// and defaults to `info`.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Creates a span for one bootstrap phase.
#[must_use]
pub fn phase_span(phase: &'static str) -> Span {
    tracing::info_span!("bootstrap", phase = phase)
}

/// Creates a span for work against a single endpoint.
#[must_use]
pub fn endpoint_span(phase: &'static str, endpoint: &str) -> Span {
    tracing::info_span!("bootstrap", phase = phase, endpoint = endpoint)
}
