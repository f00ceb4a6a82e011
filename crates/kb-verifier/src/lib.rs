#![warn(clippy::all)]
#![deny(unsafe_code)]

//! Kickbox email verification client with admission control.
//!
//! Every single verification passes an admission gate (token bucket pacing
//! plus a bounded pool of in-flight slots) before one HTTP exchange runs
//! under a per-call deadline. Batch submission and status queries skip the
//! gate; the service meters them separately.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Verifier (port)                         │
//! │          verify · verify_batch · batch_status                │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │        HttpVerifier          │       SandboxVerifier         │
//! │                              │   (canned replies by tag)     │
//! │  ┌────────────────────────┐  │                               │
//! │  │     AdmissionGate      │  │                               │
//! │  │  RateGate → SlotPool   │  │                               │
//! │  └───────────┬────────────┘  │                               │
//! │              │               │                               │
//! │  ┌───────────┴────────────┐  │                               │
//! │  │      CallExecutor      │  │                               │
//! │  │  deadline · cancel     │  │                               │
//! │  └───────────┬────────────┘  │                               │
//! │              │               │                               │
//! │  ┌───────────┴────────────┐  │                               │
//! │  │   Transport (port)     │  │                               │
//! │  │   HttpTransport        │  │                               │
//! │  └────────────────────────┘  │                               │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use kb_verifier::{HttpVerifier, Verifier, VerifierConfig, VerifyOptions};
//!
//! let config = VerifierConfig::builder(api_key).max_concurrent_calls(10).build()?;
//! let verifier = HttpVerifier::new(config)?;
//! let verification = verifier.verify("bill.lumbergh@gamil.com", VerifyOptions::new()).await?;
//! println!("{:?} (balance {})", verification.response.result, verification.meta.balance);
//! ```
//!
//! # Failure stages
//!
//! Admission rejections ([`VerifierError::RateLimitExceeded`],
//! [`VerifierError::TooManyConcurrentCalls`]) mean no request was sent.
//! Everything after admission is tagged with a [`CallStage`].

pub mod adapters;
pub mod admission;
pub mod domain;
pub mod executor;
pub mod ports;
pub mod verifier;

pub use adapters::HttpTransport;
pub use admission::{Admission, AdmissionGate, RateGate, SlotPool};
pub use domain::*;
pub use executor::CallExecutor;
pub use ports::{BatchPayload, RequestBody, Transport, TransportRequest, TransportResponse, Verifier};
pub use verifier::{HttpVerifier, SandboxVerifier, SANDBOX_BATCH_ID, SANDBOX_TEMPLATES};
