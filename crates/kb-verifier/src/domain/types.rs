//! Wire types for the Kickbox v2 API.
//!
//! Field names follow the service's JSON. Every response struct tolerates
//! missing fields so that failure replies (`{"success": false, ...}`) decode.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;

/// Verification verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationResult {
    Deliverable,
    Undeliverable,
    Risky,
    Unknown,
}

/// Reason behind a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    AcceptedEmail,
    RejectedEmail,
    InvalidDomain,
    InvalidEmail,
    InvalidSmtp,
    LowQuality,
    LowDeliverability,
    Timeout,
    UnexpectedError,
    NoConnect,
    UnavailableSmtp,
    #[serde(other)]
    Other,
}

/// Body of a single verification reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyResponse {
    pub result: Option<VerificationResult>,
    pub reason: Option<Reason>,
    pub role: bool,
    pub free: bool,
    pub disposable: bool,
    pub accept_all: bool,
    pub did_you_mean: Option<String>,
    /// Quality score in `[0, 1]`
    pub sendex: f64,
    pub email: String,
    pub user: String,
    pub domain: String,
    pub success: bool,
    pub message: Option<String>,
}

/// Metadata the service reports in response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Remaining verification credit balance (`X-Kickbox-Balance`)
    pub balance: i64,
    /// Server-side processing time in milliseconds (`X-Kickbox-Response-Time`)
    pub response_time_ms: i64,
    /// HTTP status code of the reply
    pub http_status: u16,
}

/// Successful single verification: header metadata plus decoded body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub meta: ResponseMeta,
    pub response: VerifyResponse,
}

/// Reply to a batch submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSubmission {
    pub id: u64,
    pub success: bool,
    pub message: Option<String>,
}

/// Lifecycle of a batch job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Starting,
    Processing,
    Completed,
    Failed,
}

/// Per-verdict counters while a job is processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchProgress {
    pub deliverable: u64,
    pub undeliverable: u64,
    pub risky: u64,
    pub unknown: u64,
    pub total: u64,
    pub unprocessed: u64,
}

/// Final statistics of a completed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchStats {
    pub deliverable: u64,
    pub undeliverable: u64,
    pub risky: u64,
    pub unknown: u64,
    /// Average sendex score of the batch
    pub sendex: f64,
    pub addresses: u64,
}

/// Reply to a batch status query.
///
/// Which optional parts are present depends on `status`: `progress` while
/// processing, `download_url` and `stats` once completed, and `name`,
/// `created_at`, `error`, `duration` once the job is completed or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchStatus {
    pub id: u64,
    pub status: JobStatus,
    pub success: bool,
    pub message: Option<String>,
    pub progress: Option<BatchProgress>,
    pub download_url: Option<String>,
    pub stats: Option<BatchStats>,
    pub name: Option<String>,
    /// `None` when absent or not an RFC 3339 timestamp
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub duration: Option<u64>,
}

impl BatchStatus {
    /// True once the job reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

/// Per-call options for single verification.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Maximum time for the service to complete the verification.
    /// `None` means the 6s default; must lie in `(0, 30s]`.
    pub timeout: Option<Duration>,
    /// Cancels the call when fired
    pub cancel: CancellationToken,
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Per-call options for batch submission.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Job name; the service names the result file after it
    pub filename: Option<String>,
    /// URL the service POSTs to once the job completes
    pub callback: Option<String>,
    /// Overall request timeout, 30s when unset
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_full_body() {
        let body = r#"{
            "result":"undeliverable",
            "reason":"rejected_email",
            "role":false,
            "free":false,
            "disposable":false,
            "accept_all":false,
            "did_you_mean":"bill.lumbergh@gmail.com",
            "sendex":0.23,
            "email":"bill.lumbergh@gamil.com",
            "user":"bill.lumbergh",
            "domain":"gamil.com",
            "success":true,
            "message":null
        }"#;
        let resp: VerifyResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.result, Some(VerificationResult::Undeliverable));
        assert_eq!(resp.reason, Some(Reason::RejectedEmail));
        assert_eq!(resp.did_you_mean.as_deref(), Some("bill.lumbergh@gmail.com"));
        assert_eq!(resp.domain, "gamil.com");
        assert!(resp.message.is_none());
    }

    #[test]
    fn test_verify_response_failure_body() {
        let resp: VerifyResponse =
            serde_json::from_str(r#"{"success":false,"message":"Insufficient balance"}"#).unwrap();
        assert!(resp.result.is_none());
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("Insufficient balance"));
    }

    #[test]
    fn test_unrecognized_reason() {
        let resp: VerifyResponse = serde_json::from_str(r#"{"reason":"brand_new"}"#).unwrap();
        assert_eq!(resp.reason, Some(Reason::Other));
    }

    #[test]
    fn test_batch_status_processing() {
        let body = r#"{
            "id": 123,
            "status": "processing",
            "progress": {"deliverable":1,"undeliverable":0,"risky":0,"unknown":0,"total":3,"unprocessed":2},
            "success": true,
            "message": null
        }"#;
        let status: BatchStatus = serde_json::from_str(body).unwrap();
        assert_eq!(status.status, JobStatus::Processing);
        assert_eq!(status.progress.unwrap().unprocessed, 2);
        assert!(status.stats.is_none());
        assert!(!status.is_finished());
    }

    #[test]
    fn test_batch_status_completed() {
        let body = r#"{
            "id": 123,
            "name": "Batch API Process - 05-12-2018-01-58-08",
            "download_url": "https://example.com/results.csv",
            "created_at": "2018-05-12T18:58:08.000Z",
            "status": "completed",
            "stats": {"deliverable":2,"undeliverable":1,"risky":0,"unknown":0,"sendex":0.35,"addresses":3},
            "error": null,
            "duration": 0,
            "success": true,
            "message": null
        }"#;
        let status: BatchStatus = serde_json::from_str(body).unwrap();
        assert!(status.is_finished());
        assert_eq!(status.stats.unwrap().addresses, 3);
        assert_eq!(status.duration, Some(0));
        assert!(status.created_at.is_some());
    }

    #[test]
    fn test_batch_status_tolerates_bad_timestamp() {
        for created_at in [r#""""#, r#""not a date""#, "null"] {
            let body = format!(
                r#"{{"id": 7, "status": "failed", "created_at": {created_at}, "error": "bad file", "success": true}}"#
            );
            let status: BatchStatus = serde_json::from_str(&body).unwrap();
            assert_eq!(status.id, 7);
            assert_eq!(status.status, JobStatus::Failed);
            assert_eq!(status.error.as_deref(), Some("bad file"));
            assert!(status.created_at.is_none(), "{created_at}");
        }
    }

    #[test]
    fn test_verify_options_builder() {
        let opts = VerifyOptions::new().timeout(Duration::from_secs(10));
        assert_eq!(opts.timeout, Some(Duration::from_secs(10)));
        assert!(!opts.cancel.is_cancelled());
    }
}
