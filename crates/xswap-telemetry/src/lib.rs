//! # xswap Telemetry
//!
//! Structured logging for the xswap binaries, built on `tracing` and
//! `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xswap_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XSWAP_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `XSWAP_JSON_LOGS` | `false` | JSON output |
//! | `XSWAP_CONSOLE_OUTPUT` | `true` | Write logs to stderr |
//! | `XSWAP_PARTY` | unset | Party label added to the service name |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Bad filter directive or other configuration problem
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and return a guard for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(&config)?;
    tracing::debug!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(TelemetryGuard {
        service_name: config.full_service_name(),
    })
}

/// Guard that keeps telemetry active. Logs shutdown on drop.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "Shutting down telemetry");
    }
}
