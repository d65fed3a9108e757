//! Clock abstraction for retry pacing.
//!
//! Every wait between retry attempts goes through [`Clock::sleep`], so tests
//! can substitute a simulated clock and run without real delays.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

/// Source of delays for retry loops.
#[async_trait]
pub trait Clock: Send + Sync + Debug {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
