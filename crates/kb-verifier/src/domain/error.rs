//! Verifier error taxonomy.
//!
//! Every failure is returned to the caller as a value. Nothing here is retried
//! internally; callers own retry policy.

use std::fmt;
use std::time::Duration;

use super::config::ConfigError;
use super::types::ResponseMeta;

/// Boundary stage a staged failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    /// Building the outbound request (URL, headers, body).
    RequestBuild,
    /// The exchange with the remote service itself.
    Transport,
    /// Decoding the response body.
    Decode,
}

impl fmt::Display for CallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStage::RequestBuild => write!(f, "request-build"),
            CallStage::Transport => write!(f, "transport"),
            CallStage::Decode => write!(f, "decode"),
        }
    }
}

/// Why a rate-wait ended without a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateWaitCause {
    /// The call deadline elapsed first.
    #[error("no rate token within {waited:?}")]
    DeadlineElapsed { waited: Duration },
    /// The caller's cancellation token fired first.
    #[error("call cancelled while waiting for a rate token")]
    Cancelled,
}

/// Failure of one boundary exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call deadline elapsed before the exchange completed.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// The caller cancelled the call mid-exchange.
    #[error("call cancelled")]
    Cancelled,

    /// The remote endpoint could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// HTTP client failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Failure reported by a custom transport.
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by every verifier operation.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// Invalid construction input.
    #[error("applying optional settings: {0}")]
    Configuration(#[from] ConfigError),

    /// The rate-wait did not resolve before the deadline or cancellation.
    #[error("rate limiting requests: {cause}")]
    RateLimitExceeded { cause: RateWaitCause },

    /// Every concurrency slot was occupied at the acquisition instant.
    #[error("max concurrent calls in flight: {capacity}")]
    TooManyConcurrentCalls { capacity: usize },

    /// The outbound request could not be built.
    #[error("building request: {0}")]
    RequestBuild(String),

    /// The boundary exchange failed.
    #[error("doing request: {0}")]
    Transport(#[source] TransportError),

    /// The response body could not be decoded.
    ///
    /// `meta` holds whatever response metadata was read before decoding.
    #[error("decoding response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        meta: Option<ResponseMeta>,
    },

    /// Invalid caller-supplied argument, detected before any network activity.
    #[error("{0}")]
    Usage(String),

    /// The operation is not provided by this verifier.
    #[error("{0} is not implemented")]
    Unsupported(&'static str),
}

impl VerifierError {
    /// Create a usage error
    pub fn usage(details: impl Into<String>) -> Self {
        Self::Usage(details.into())
    }

    /// Boundary stage of a staged failure, `None` for every other kind.
    pub fn stage(&self) -> Option<CallStage> {
        match self {
            VerifierError::RequestBuild(_) => Some(CallStage::RequestBuild),
            VerifierError::Transport(_) => Some(CallStage::Transport),
            VerifierError::Decode { .. } => Some(CallStage::Decode),
            _ => None,
        }
    }

    /// Response metadata obtained before the failure, if any.
    pub fn response_meta(&self) -> Option<&ResponseMeta> {
        match self {
            VerifierError::Decode { meta, .. } => meta.as_ref(),
            _ => None,
        }
    }

    /// True for admission rejections (rate or concurrency).
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            VerifierError::RateLimitExceeded { .. } | VerifierError::TooManyConcurrentCalls { .. }
        )
    }
}

/// Result type for verifier operations
pub type VerifierResult<T> = Result<T, VerifierError>;
