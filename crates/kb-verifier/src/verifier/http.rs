//! Verifier backed by the remote Kickbox API.
//!
//! Single verification goes through the admission gate; batch operations
//! only carry a deadline, the service meters them under a separate quota.
//!
//! API reference:
//! - <https://docs.kickbox.com/docs/single-verification-api>
//! - <https://docs.kickbox.com/docs/batch-verification-api>

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::HttpTransport;
use crate::admission::AdmissionGate;
use crate::domain::{
    BatchOptions, BatchStatus, BatchSubmission, CallContext, CallEnvelope, CallKind, ConfigError,
    ResponseMeta, Verification, VerifierConfig, VerifierError, VerifierResult, VerifyOptions,
    VerifyResponse, BATCH_STATUS_TIMEOUT, DEFAULT_BATCH_TIMEOUT, DEFAULT_VERIFY_TIMEOUT,
    MAX_VERIFY_TIMEOUT,
};
use crate::executor::CallExecutor;
use crate::ports::inbound::{BatchPayload, Verifier};
use crate::ports::outbound::{RequestBody, Transport, TransportRequest, TransportResponse};

const VERIFY_PATH: &str = "/v2/verify";
const VERIFY_BATCH_PATH: &str = "/v2/verify-batch";

const BALANCE_HEADER: &str = "x-kickbox-balance";
const RESPONSE_TIME_HEADER: &str = "x-kickbox-response-time";
const FILENAME_HEADER: &str = "x-kickbox-filename";
const CALLBACK_HEADER: &str = "x-kickbox-callback";

/// Remote-backed verifier. Owns its admission gate; two instances never
/// share tokens or slots.
pub struct HttpVerifier {
    api_key: String,
    base_url: String,
    gate: AdmissionGate,
    executor: CallExecutor,
    transport: Arc<dyn Transport>,
}

impl HttpVerifier {
    /// Create a verifier from validated configuration.
    pub fn new(config: VerifierConfig) -> VerifierResult<Self> {
        let gate = AdmissionGate::from_config(&config)?;
        let transport: Arc<dyn Transport> = match config.transport() {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(
                HttpTransport::new(config.http_timeout())
                    .map_err(|e| ConfigError::HttpClient(e.to_string()))?,
            ),
        };

        info!(
            base_url = %config.base_url(),
            max_concurrent_calls = config.max_concurrent_calls(),
            calls_per_minute = config.rate_limit().calls_per_minute,
            custom_rate_limiter = config.rate_limiter().is_some(),
            custom_transport = config.transport().is_some(),
            "Kickbox verifier created"
        );

        Ok(Self {
            api_key: config.api_key().to_string(),
            base_url: config.base_url().to_string(),
            gate,
            executor: CallExecutor::new(),
            transport,
        })
    }

    /// Shortcut for `HttpVerifier::new(VerifierConfig::builder(api_key).build()?)`.
    pub fn with_api_key(api_key: impl Into<String>) -> VerifierResult<Self> {
        Self::new(VerifierConfig::builder(api_key).build()?)
    }

    /// Admission gate guarding single verification.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    fn endpoint(&self, path: &str, segment: Option<&str>, query: &[(&str, &str)]) -> VerifierResult<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw)
            .map_err(|e| VerifierError::RequestBuild(format!("parse {raw:?}: {e}")))?;

        if let Some(segment) = segment {
            url.path_segments_mut()
                .map_err(|_| VerifierError::RequestBuild(format!("{raw:?} cannot carry a path")))?
                .push(segment);
        }
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn exchange(
        &self,
        request: TransportRequest,
        ctx: &CallContext,
    ) -> VerifierResult<(ResponseMeta, TransportResponse)> {
        let response = self
            .transport
            .exchange(request, ctx)
            .await
            .map_err(VerifierError::Transport)?;
        Ok((response_meta(&response), response))
    }

    async fn exchange_verify(
        &self,
        email: &str,
        timeout: Duration,
        ctx: CallContext,
    ) -> VerifierResult<Verification> {
        let timeout_ms = timeout.as_millis().to_string();
        let url = self.endpoint(
            VERIFY_PATH,
            None,
            &[("email", email), ("apikey", self.api_key.as_str()), ("timeout", timeout_ms.as_str())],
        )?;
        let request = TransportRequest {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        };

        let (meta, response) = self.exchange(request, &ctx).await?;
        let response: VerifyResponse = decode(&response, meta)?;
        Ok(Verification { meta, response })
    }

    async fn exchange_batch(
        &self,
        payload: BatchPayload,
        options: &BatchOptions,
        ctx: CallContext,
    ) -> VerifierResult<BatchSubmission> {
        let url = self.endpoint(VERIFY_BATCH_PATH, None, &[("apikey", self.api_key.as_str())])?;

        let mut headers = HeaderMap::new();
        if let Some(filename) = options.filename.as_deref().filter(|s| !s.is_empty()) {
            headers.insert(FILENAME_HEADER, header_value("filename", filename)?);
        }
        if let Some(callback) = options.callback.as_deref().filter(|s| !s.is_empty()) {
            headers.insert(CALLBACK_HEADER, header_value("callback", callback)?);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));

        let request = TransportRequest {
            method: Method::PUT,
            url,
            headers,
            body: payload.into_body(),
        };

        let (meta, response) = self.exchange(request, &ctx).await?;
        decode(&response, meta)
    }

    async fn exchange_batch_status(&self, batch_id: &str, ctx: CallContext) -> VerifierResult<BatchStatus> {
        let url = self.endpoint(VERIFY_BATCH_PATH, Some(batch_id), &[("apikey", self.api_key.as_str())])?;
        let request = TransportRequest {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        };

        let (meta, response) = self.exchange(request, &ctx).await?;
        decode(&response, meta)
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(&self, email: &str, options: VerifyOptions) -> VerifierResult<Verification> {
        let timeout = options.timeout.unwrap_or(DEFAULT_VERIFY_TIMEOUT);
        if timeout.is_zero() || timeout > MAX_VERIFY_TIMEOUT {
            return Err(VerifierError::usage(format!(
                "timeout not valid, must be within (0s, {}s]: {:?}",
                MAX_VERIFY_TIMEOUT.as_secs(),
                timeout
            )));
        }

        let envelope = CallEnvelope::new(CallKind::SingleVerify, timeout, options.cancel);
        let admission = self.gate.acquire(envelope.deadline, &envelope.cancel).await?;

        let result = self
            .executor
            .run(&envelope, |ctx| self.exchange_verify(email, timeout, ctx))
            .await;

        self.gate.release(admission);
        result
    }

    async fn verify_batch(
        &self,
        payload: BatchPayload,
        options: BatchOptions,
    ) -> VerifierResult<BatchSubmission> {
        let timeout = options.timeout.unwrap_or(DEFAULT_BATCH_TIMEOUT);
        if timeout.is_zero() {
            return Err(VerifierError::usage("batch timeout must be greater than zero"));
        }

        let envelope = CallEnvelope::new(CallKind::BatchSubmit, timeout, options.cancel.clone());
        self.executor
            .run(&envelope, |ctx| self.exchange_batch(payload, &options, ctx))
            .await
    }

    async fn batch_status(&self, batch_id: &str) -> VerifierResult<BatchStatus> {
        if batch_id.is_empty() {
            return Err(VerifierError::usage("batch id is empty"));
        }

        let envelope = CallEnvelope::new(
            CallKind::BatchStatus,
            BATCH_STATUS_TIMEOUT,
            CancellationToken::new(),
        );
        self.executor
            .run(&envelope, |ctx| self.exchange_batch_status(batch_id, ctx))
            .await
    }
}

/// Header metadata; unparsable counters read as zero.
fn response_meta(response: &TransportResponse) -> ResponseMeta {
    ResponseMeta {
        balance: header_int(&response.headers, BALANCE_HEADER),
        response_time_ms: header_int(&response.headers, RESPONSE_TIME_HEADER),
        http_status: response.status.as_u16(),
    }
}

fn header_int(headers: &HeaderMap, name: &str) -> i64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn header_value(field: &str, value: &str) -> VerifierResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| VerifierError::RequestBuild(format!("invalid {field} header: {e}")))
}

fn decode<T: DeserializeOwned>(response: &TransportResponse, meta: ResponseMeta) -> VerifierResult<T> {
    serde_json::from_slice(&response.body).map_err(|source| VerifierError::Decode {
        source,
        meta: Some(meta),
    })
}
