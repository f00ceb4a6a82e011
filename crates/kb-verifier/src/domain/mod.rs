//! Domain layer: configuration, wire types, call envelope and errors.

pub mod config;
pub mod envelope;
pub mod error;
pub mod types;

pub use config::*;
pub use envelope::*;
pub use error::*;
pub use types::*;
