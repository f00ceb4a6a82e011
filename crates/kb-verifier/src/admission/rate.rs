//! Token bucket pacing over a governor GCRA limiter.
//!
//! Granting is a single compare-and-swap inside governor, so each freshly
//! replenished token goes to exactly one waiter. Waiters that lose the race
//! sleep until the next replenishment, they never spin.

use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, RateLimiter};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{ConfigError, RateLimitConfig, RateWaitCause};

/// Rate half of the admission gate.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl RateGate {
    pub fn new(config: RateLimitConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(config.quota()?)),
        })
    }

    /// Wrap a caller-supplied limiter.
    pub fn from_limiter(limiter: Arc<DefaultDirectRateLimiter>) -> Self {
        Self { limiter }
    }

    /// Take a token without waiting.
    pub fn try_take(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait for a token until `deadline` or cancellation, whichever is first.
    ///
    /// Losing the race to the deadline or the token consumes nothing.
    pub async fn wait(&self, deadline: Instant, cancel: &CancellationToken) -> Result<(), RateWaitCause> {
        let started = Instant::now();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                warn!(waited_ms = started.elapsed().as_millis() as u64, "Rate wait cancelled");
                Err(RateWaitCause::Cancelled)
            }
            _ = self.limiter.until_ready() => {
                debug!(waited_ms = started.elapsed().as_millis() as u64, "Rate token granted");
                Ok(())
            }
            _ = tokio::time::sleep_until(deadline) => {
                let waited = started.elapsed();
                warn!(waited_ms = waited.as_millis() as u64, "Rate wait deadline elapsed");
                Err(RateWaitCause::DeadlineElapsed { waited })
            }
        }
    }
}
