//! Outbound (driven) port: one HTTP-like exchange with the remote service.

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};

use crate::domain::{CallContext, TransportError};

/// Request body handed to a transport.
pub enum RequestBody {
    Empty,
    Bytes(Bytes),
    /// Streamed upload; consumed exactly once
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            RequestBody::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// Fully built outbound request.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// Reply from the remote service. The body is read completely, so the
/// underlying connection is already released when this value exists.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Performs boundary exchanges.
///
/// Implementations must honour `ctx`: stop waiting once the deadline passes
/// or the token is cancelled.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        request: TransportRequest,
        ctx: &CallContext,
    ) -> Result<TransportResponse, TransportError>;
}
