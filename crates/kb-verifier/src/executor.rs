//! Call executor: runs one boundary exchange under the envelope's deadline.
//!
//! No retries and no compensation. Staged failures from the exchange come
//! back verbatim; deadline expiry and cancellation are reported as
//! transport-stage failures.

use std::future::Future;

use tracing::{debug, info_span, warn, Instrument};

use crate::domain::{CallContext, CallEnvelope, TransportError, VerifierError, VerifierResult};

/// Executes boundary exchanges. Stateless; one per verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallExecutor;

impl CallExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `do_call` bound to `envelope.deadline` and `envelope.cancel`.
    ///
    /// `do_call` receives the deadline-bound context so the exchange can
    /// abort on its own; the executor also drops the exchange future when the
    /// deadline or cancellation fires, which releases any connection it held
    /// before `run` returns.
    pub async fn run<T, F, Fut>(&self, envelope: &CallEnvelope, do_call: F) -> VerifierResult<T>
    where
        F: FnOnce(CallContext) -> Fut,
        Fut: Future<Output = VerifierResult<T>>,
    {
        let span = info_span!("kickbox_call", kind = %envelope.kind);
        let ctx = envelope.context();
        let timeout = envelope.timeout;

        async move {
            let exchange = do_call(ctx);

            let result = tokio::select! {
                biased;

                _ = envelope.cancel.cancelled() => {
                    warn!("Call cancelled");
                    Err(VerifierError::Transport(TransportError::Cancelled))
                }
                result = exchange => result,
                _ = tokio::time::sleep_until(envelope.deadline) => {
                    warn!(timeout_ms = timeout.as_millis() as u64, "Call deadline exceeded");
                    Err(VerifierError::Transport(TransportError::DeadlineExceeded(timeout)))
                }
            };

            match &result {
                Ok(_) => debug!("Call completed"),
                Err(e) => debug!(error = %e, stage = ?e.stage(), "Call failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
