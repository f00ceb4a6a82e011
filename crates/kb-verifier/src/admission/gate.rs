//! Joint rate + concurrency gate guarding one remote endpoint.
//!
//! Order is fixed: rate first (may wait), concurrency second (never waits).
//! A burst of callers is paced by the token bucket before any of them can
//! contend for the slot pool, and a saturated pool rejects immediately
//! instead of queueing callers that already paid a rate wait.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::rate::RateGate;
use super::slots::{Slot, SlotPool};
use crate::domain::{ConfigError, VerifierConfig, VerifierError, VerifierResult};

/// Grant returned by [`AdmissionGate::acquire`].
///
/// Holds one concurrency slot. The slot returns to the pool when the
/// admission is released or dropped, so every exit path frees it exactly once.
#[derive(Debug)]
#[must_use = "dropping an Admission releases its slot immediately"]
pub struct Admission {
    _slot: Slot,
    granted_at: Instant,
}

impl Admission {
    /// Time since the slot was taken
    pub fn held_for(&self) -> Duration {
        self.granted_at.elapsed()
    }
}

/// Admission gate. Cloning shares the same token bucket and slot pool.
#[derive(Clone)]
pub struct AdmissionGate {
    rate: RateGate,
    slots: SlotPool,
}

impl AdmissionGate {
    pub fn new(rate: RateGate, max_concurrent_calls: usize) -> Self {
        Self {
            rate,
            slots: SlotPool::new(max_concurrent_calls),
        }
    }

    /// Build the gate a verifier instance owns.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        let rate = match config.rate_limiter() {
            Some(limiter) => RateGate::from_limiter(limiter.clone()),
            None => RateGate::new(config.rate_limit())?,
        };
        Ok(Self::new(rate, config.max_concurrent_calls()))
    }

    /// Wait for a rate token, then take a slot without waiting.
    pub async fn acquire(
        &self,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> VerifierResult<Admission> {
        self.rate
            .wait(deadline, cancel)
            .await
            .map_err(|cause| VerifierError::RateLimitExceeded { cause })?;

        match self.slots.try_acquire() {
            Some(slot) => {
                debug!(in_flight = self.slots.in_flight(), "Admission granted");
                Ok(Admission {
                    _slot: slot,
                    granted_at: Instant::now(),
                })
            }
            None => {
                warn!(capacity = self.slots.capacity(), "Concurrency slots exhausted");
                Err(VerifierError::TooManyConcurrentCalls {
                    capacity: self.slots.capacity(),
                })
            }
        }
    }

    /// Return the admission's slot to the pool.
    pub fn release(&self, admission: Admission) {
        let held_for = admission.held_for();
        drop(admission);
        debug!(
            held_ms = held_for.as_millis() as u64,
            in_flight = self.slots.in_flight(),
            "Admission released"
        );
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn in_flight(&self) -> usize {
        self.slots.in_flight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RateLimitConfig, RateWaitCause};

    fn fast_gate(capacity: usize) -> AdmissionGate {
        let rate = RateGate::new(RateLimitConfig {
            calls_per_minute: 60_000,
            burst: 64,
        })
        .unwrap();
        AdmissionGate::new(rate, capacity)
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_excess_caller_rejected() {
        for capacity in 1..=8 {
            let gate = fast_gate(capacity);
            let cancel = CancellationToken::new();

            let mut held = Vec::new();
            let mut rejected = 0;
            for _ in 0..=capacity {
                match gate.acquire(deadline(), &cancel).await {
                    Ok(admission) => held.push(admission),
                    Err(VerifierError::TooManyConcurrentCalls { capacity: c }) => {
                        assert_eq!(c, capacity);
                        rejected += 1;
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }

            assert_eq!(held.len(), capacity);
            assert_eq!(rejected, 1);
            assert_eq!(gate.in_flight(), capacity);
        }
    }

    #[tokio::test]
    async fn test_release_frees_slot_for_next_caller() {
        let gate = fast_gate(1);
        let cancel = CancellationToken::new();

        let first = gate.acquire(deadline(), &cancel).await.unwrap();
        assert!(matches!(
            gate.acquire(deadline(), &cancel).await,
            Err(VerifierError::TooManyConcurrentCalls { .. })
        ));

        gate.release(first);
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.acquire(deadline(), &cancel).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_admission_frees_slot() {
        let gate = fast_gate(1);
        let cancel = CancellationToken::new();
        {
            let _admission = gate.acquire(deadline(), &cancel).await.unwrap();
            assert_eq!(gate.in_flight(), 1);
        }
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_rate_wait_is_prompt() {
        let rate = RateGate::new(RateLimitConfig {
            calls_per_minute: 1,
            burst: 1,
        })
        .unwrap();
        let gate = AdmissionGate::new(rate, 4);
        let cancel = CancellationToken::new();

        let _first = gate.acquire(deadline(), &cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = gate
            .acquire(Instant::now() + Duration::from_secs(10), &cancel)
            .await;
        assert!(matches!(
            result,
            Err(VerifierError::RateLimitExceeded {
                cause: RateWaitCause::Cancelled
            })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(gate.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_rate_timeout_takes_no_slot() {
        let rate = RateGate::new(RateLimitConfig {
            calls_per_minute: 1,
            burst: 1,
        })
        .unwrap();
        let gate = AdmissionGate::new(rate, 4);
        let cancel = CancellationToken::new();

        let _first = gate.acquire(deadline(), &cancel).await.unwrap();
        let result = gate
            .acquire(Instant::now() + Duration::from_millis(100), &cancel)
            .await;
        assert!(matches!(
            result,
            Err(VerifierError::RateLimitExceeded {
                cause: RateWaitCause::DeadlineElapsed { .. }
            })
        ));
        assert_eq!(gate.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_independent_gates_share_nothing() {
        let a = fast_gate(1);
        let b = fast_gate(1);
        let cancel = CancellationToken::new();

        let _held = a.acquire(deadline(), &cancel).await.unwrap();
        assert!(b.acquire(deadline(), &cancel).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquirers_never_overfill_pool() {
        let capacity = 8;
        let gate = fast_gate(capacity);

        let callers: Vec<_> = (0..capacity * 2)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.acquire(deadline(), &CancellationToken::new()).await })
            })
            .collect();

        let mut held = Vec::new();
        let mut rejected = 0;
        for caller in callers {
            match caller.await.unwrap() {
                Ok(admission) => held.push(admission),
                Err(VerifierError::TooManyConcurrentCalls { .. }) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(held.len(), capacity);
        assert_eq!(rejected, capacity);
        assert_eq!(gate.in_flight(), capacity);

        drop(held);
        assert_eq!(gate.in_flight(), 0);
    }
}
