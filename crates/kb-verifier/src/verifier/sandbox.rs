//! Deterministic stand-in for the remote service.
//!
//! Mirrors the documented sandbox API: the local part of the address (or a
//! `+tag` suffix on it) selects a canned reply.
//! See <https://docs.kickbox.com/docs/sandbox-api>.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::domain::{
    BatchOptions, BatchStatus, BatchSubmission, ResponseMeta, Verification, VerifierError,
    VerifierResult, VerifyOptions, VerifyResponse,
};
use crate::ports::inbound::{BatchPayload, Verifier};

/// Job id every sandbox batch submission reports
pub const SANDBOX_BATCH_ID: u64 = 123_456;

const DELIVERABLE: &str = r#"{
    "result": "deliverable", "reason": "accepted_email",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 1, "success": true, "message": null
}"#;

const UNDELIVERABLE: &str = r#"{
    "result": "undeliverable", "reason": "rejected_email",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const INVALID_DOMAIN: &str = r#"{
    "result": "undeliverable", "reason": "invalid_domain",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const INVALID_EMAIL: &str = r#"{
    "result": "undeliverable", "reason": "invalid_email",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const INVALID_SMTP: &str = r#"{
    "result": "undeliverable", "reason": "invalid_smtp",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const LOW_QUALITY: &str = r#"{
    "result": "risky", "reason": "low_quality",
    "role": false, "free": true, "disposable": false, "accept_all": false,
    "sendex": 0.5, "success": true, "message": null
}"#;

const ACCEPT_ALL: &str = r#"{
    "result": "risky", "reason": "low_deliverability",
    "role": false, "free": false, "disposable": false, "accept_all": true,
    "sendex": 0.7, "success": true, "message": null
}"#;

const ROLE: &str = r#"{
    "result": "risky", "reason": "low_quality",
    "role": true, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0.7, "success": true, "message": null
}"#;

const DISPOSABLE: &str = r#"{
    "result": "risky", "reason": "low_quality",
    "role": false, "free": false, "disposable": true, "accept_all": true,
    "sendex": 0, "success": true, "message": null
}"#;

const TIMEOUT: &str = r#"{
    "result": "unknown", "reason": "timeout",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const UNEXPECTED_ERROR: &str = r#"{
    "result": "unknown", "reason": "unexpected_error",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const NO_CONNECT: &str = r#"{
    "result": "unknown", "reason": "no_connect",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const UNAVAILABLE_SMTP: &str = r#"{
    "result": "unknown", "reason": "unavailable_smtp",
    "role": false, "free": false, "disposable": false, "accept_all": false,
    "sendex": 0, "success": true, "message": null
}"#;

const INSUFFICIENT_BALANCE: &str = r#"{
    "success": false,
    "message": "Insufficient balance"
}"#;

/// Sandbox tags in evaluation order, paired with their reply template.
pub const SANDBOX_TEMPLATES: [(&str, &str); 14] = [
    ("deliverable", DELIVERABLE),
    ("undeliverable", UNDELIVERABLE),
    ("invalid-domain", INVALID_DOMAIN),
    ("invalid-email", INVALID_EMAIL),
    ("invalid-smtp", INVALID_SMTP),
    ("low-quality", LOW_QUALITY),
    ("accept-all", ACCEPT_ALL),
    ("role", ROLE),
    ("disposable", DISPOSABLE),
    ("unexpected-error", UNEXPECTED_ERROR),
    ("timeout", TIMEOUT),
    ("no-connect", NO_CONNECT),
    ("unavailable-smtp", UNAVAILABLE_SMTP),
    ("insufficient-balance", INSUFFICIENT_BALANCE),
];

struct SandboxRule {
    pattern: Regex,
    reply: VerifyResponse,
}

/// Ordered rules, first match wins.
static RULES: LazyLock<Vec<SandboxRule>> = LazyLock::new(|| {
    SANDBOX_TEMPLATES
        .iter()
        .map(|(tag, template)| {
            let tag = regex::escape(tag);
            SandboxRule {
                pattern: Regex::new(&format!(r"^{tag}@.+|.+\+{tag}@.+"))
                    .expect("invalid sandbox pattern"),
                reply: parse_template(template),
            }
        })
        .collect()
});

static DEFAULT_REPLY: LazyLock<VerifyResponse> = LazyLock::new(|| parse_template(DELIVERABLE));

fn parse_template(template: &str) -> VerifyResponse {
    serde_json::from_str(template).expect("invalid sandbox template")
}

/// Verifier that never leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxVerifier;

impl SandboxVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Canned reply for `email`, before address fields are filled in.
    fn reply_for(email: &str) -> &'static VerifyResponse {
        RULES
            .iter()
            .find(|rule| rule.pattern.is_match(email))
            .map(|rule| &rule.reply)
            .unwrap_or(&*DEFAULT_REPLY)
    }
}

#[async_trait]
impl Verifier for SandboxVerifier {
    async fn verify(&self, email: &str, _options: VerifyOptions) -> VerifierResult<Verification> {
        let mut response = Self::reply_for(email).clone();

        response.email = email.to_lowercase();
        let mut parts = response.email.split('@');
        if let (Some(user), Some(domain), None) = (parts.next(), parts.next(), parts.next()) {
            response.user = user.to_string();
            response.domain = domain.to_string();
        }

        debug!(result = ?response.result, reason = ?response.reason, "Sandbox verification");

        Ok(Verification {
            meta: ResponseMeta {
                balance: 1,
                response_time_ms: 1,
                http_status: 200,
            },
            response,
        })
    }

    async fn verify_batch(
        &self,
        _payload: BatchPayload,
        _options: BatchOptions,
    ) -> VerifierResult<BatchSubmission> {
        Ok(BatchSubmission {
            id: SANDBOX_BATCH_ID,
            success: true,
            message: None,
        })
    }

    async fn batch_status(&self, _batch_id: &str) -> VerifierResult<BatchStatus> {
        Err(VerifierError::Unsupported("sandbox batch status"))
    }
}
