//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Body, Client};
use tracing::debug;

use crate::domain::{CallContext, TransportError};
use crate::ports::outbound::{RequestBody, Transport, TransportRequest, TransportResponse};

/// Default transport: one shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose client-wide timeout is `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(
        &self,
        request: TransportRequest,
        ctx: &CallContext,
    ) -> Result<TransportResponse, TransportError> {
        let remaining = ctx.remaining();
        if remaining.is_zero() {
            return Err(TransportError::DeadlineExceeded(Duration::ZERO));
        }

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(remaining);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Stream(stream) => builder.body(Body::wrap_stream(stream)),
        };

        let response = builder.send().await.map_err(|e| classify(e, remaining))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify(e, remaining))?;

        debug!(
            kind = %ctx.kind,
            status = status.as_u16(),
            body_bytes = body.len(),
            "Exchange completed"
        );

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(e: reqwest::Error, budget: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::DeadlineExceeded(budget)
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Http(e)
    }
}
