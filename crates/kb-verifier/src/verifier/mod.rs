//! Verifier implementations.

pub mod http;
pub mod sandbox;

pub use http::HttpVerifier;
pub use sandbox::{SandboxVerifier, SANDBOX_BATCH_ID, SANDBOX_TEMPLATES};
