//! # MHS Telemetry
//!
//! Structured logging for the message handling service.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mhs_telemetry::{init_logging, TelemetryConfig};
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
//! | `OTEL_SERVICE_NAME` | `mhs-transport` | Service name in logs |
//! | `MHS_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `MHS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `MHS_JSON_LOGS` | `false` (`true` in containers) | JSON lines output |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
