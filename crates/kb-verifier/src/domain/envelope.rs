//! Per-call envelope and the execution context handed to the boundary.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Operation a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    SingleVerify,
    BatchSubmit,
    BatchStatus,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::SingleVerify => write!(f, "single-verify"),
            CallKind::BatchSubmit => write!(f, "batch-submit"),
            CallKind::BatchStatus => write!(f, "batch-status"),
        }
    }
}

/// One call attempt. Created per call, discarded when the call completes.
#[derive(Debug, Clone)]
pub struct CallEnvelope {
    pub kind: CallKind,
    pub deadline: Instant,
    /// Budget the deadline was derived from
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl CallEnvelope {
    /// Envelope whose deadline is `timeout` from now.
    pub fn new(kind: CallKind, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            kind,
            deadline: Instant::now() + timeout,
            timeout,
            cancel,
        }
    }

    /// Deadline-bound context for the boundary exchange.
    pub fn context(&self) -> CallContext {
        CallContext {
            kind: self.kind,
            deadline: self.deadline,
            cancel: self.cancel.clone(),
        }
    }
}

/// Context a transport receives so it can abort promptly on expiry.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub kind: CallKind,
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl CallContext {
    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}
