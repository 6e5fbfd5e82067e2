//! # OVOS Bus Telemetry
//!
//! Structured logging for the message bus, built on `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ovos_bus_telemetry::{init_logging, TelemetryConfig};
//!
//! let _guard = init_logging(&TelemetryConfig::from_env())?;
//! tracing::info!("bus starting");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OVOS_BUS_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `OVOS_BUS_JSON_LOGS` | `false` | JSON lines (`true` inside containers) |
//! | `OVOS_BUS_LOG_ANSI` | `true` | Coloured human-readable output |

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod logging;

pub use config::{TelemetryConfig, SERVICE_NAME};
pub use logging::{build_filter, init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}
