//! Telemetry configuration from environment variables.

use std::env;

/// Default service name attached to every log line.
pub const SERVICE_NAME: &str = "ovos-messagebus";

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name recorded in the startup line
    pub service_name: String,

    /// Log filter directive (`info`, `ovos_bus_server=debug`, ...)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether human-readable logs use ANSI colours
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OVOS_BUS_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `OVOS_BUS_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `OVOS_BUS_LOG_ANSI`: Coloured output (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: SERVICE_NAME.to_string(),

            log_level: lookup("OVOS_BUS_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            json_logs: lookup("OVOS_BUS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            ansi: lookup("OVOS_BUS_LOG_ANSI")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}
