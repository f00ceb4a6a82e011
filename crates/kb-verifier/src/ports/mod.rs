//! Ports for the verifier.

pub mod inbound;
pub mod outbound;

pub use inbound::{BatchPayload, Verifier};
pub use outbound::{RequestBody, Transport, TransportRequest, TransportResponse};
