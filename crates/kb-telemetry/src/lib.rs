//! # Kickbox Telemetry
//!
//! Logging bootstrap shared by Kickbox verifier binaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kb_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // ...
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KB_SERVICE_NAME` | `kb-verify` | Service name in log events |
//! | `KB_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `KB_JSON_LOGS` | `false` | JSON output (defaults on in containers) |
//! | `NO_COLOR` | unset | Disable ANSI colors |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}
