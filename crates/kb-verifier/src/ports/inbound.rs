//! Inbound (driving) port: the verifier capability set.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::domain::{
    BatchOptions, BatchStatus, BatchSubmission, Verification, VerifierResult, VerifyOptions,
};
use crate::ports::outbound::RequestBody;

/// CSV payload of a batch submission.
#[derive(Debug)]
pub struct BatchPayload(RequestBody);

impl BatchPayload {
    /// Stream the payload from any async reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self(RequestBody::Stream(Box::pin(ReaderStream::new(reader))))
    }

    /// Payload already held in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(RequestBody::Bytes(bytes.into()))
    }

    pub(crate) fn into_body(self) -> RequestBody {
        self.0
    }
}

/// Single verification, batch submission and batch status.
///
/// Implemented by the HTTP-backed [`crate::HttpVerifier`] and by the
/// deterministic [`crate::SandboxVerifier`].
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verify one address.
    async fn verify(&self, email: &str, options: VerifyOptions) -> VerifierResult<Verification>;

    /// Submit a CSV of addresses for asynchronous verification.
    async fn verify_batch(
        &self,
        payload: BatchPayload,
        options: BatchOptions,
    ) -> VerifierResult<BatchSubmission>;

    /// Query the state of a submitted batch job.
    async fn batch_status(&self, batch_id: &str) -> VerifierResult<BatchStatus>;
}
