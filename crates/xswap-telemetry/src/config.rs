//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Optional party label (e.g. `alice`), useful when two parties log to
    /// the same terminal
    pub party: Option<String>,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to write logs to stderr at all
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "xswap".to_string(),
            party: None,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XSWAP_SERVICE_NAME`: Service name (default: xswap)
    /// - `XSWAP_PARTY`: Party label (default: unset)
    /// - `XSWAP_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `XSWAP_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `XSWAP_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("XSWAP_SERVICE_NAME").unwrap_or_else(|_| "xswap".to_string()),

            party: env::var("XSWAP_PARTY").ok().filter(|p| !p.is_empty()),

            log_level: env::var("XSWAP_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("XSWAP_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(true),

            json_logs: env::var("XSWAP_JSON_LOGS")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(is_container),
        }
    }

    /// Set the log level, keeping everything else.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Label logs with a party name.
    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.party = Some(party.into());
        self
    }

    /// Service name including the party label, if any.
    pub fn full_service_name(&self) -> String {
        match &self.party {
            Some(party) => format!("{}-{}", self.service_name, party),
            None => self.service_name.clone(),
        }
    }
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
