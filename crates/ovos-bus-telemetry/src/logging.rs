//! Subscriber installation.
//!
//! JSON output is meant for containers where a log shipper parses every
//! line; the human-readable format is the default on a device.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Returned by [`init_logging`]; logs a final line when dropped.
pub struct LoggingGuard {
    service_name: String,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Logging shut down");
    }
}

/// Build the filter from the configured directive.
///
/// `RUST_LOG` has already been folded into `log_level` by the config.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Filter(format!("{}: {}", config.log_level, e)))
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    let env_filter = build_filter(config)?;

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(config.ansi);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        service_name: config.service_name.clone(),
    })
}
