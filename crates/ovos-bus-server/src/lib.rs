#![allow(missing_docs)]

//! OVOS Bus Server - WebSocket front end for the OpenVoiceOS message bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    MESSAGE BUS SERVER                     │
//! ├──────────────────────────────────────────────────────────┤
//! │   ws://host:8181/core   or   wss://host:8181/core         │
//! │                         │                                 │
//! │            ┌────────────┴────────────┐                    │
//! │            │   WebSocketUpgrade      │  max_msg_size      │
//! │            └────────────┬────────────┘                    │
//! │                         │ one per client                  │
//! │            ┌────────────┴────────────┐                    │
//! │            │   ConnectionHandler     │                    │
//! │            └────────────┬────────────┘                    │
//! └─────────────────────────┼────────────────────────────────┘
//!                           │
//!                      MessageHub (fan-out)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ovos_bus_server::{BusConfig, MessageBusService};
//!
//! let config = BusConfig::load();
//! let stats = MessageBusService::new(config)?.run().await?;
//! ```
//!
//! # Configuration
//!
//! Defaults, then the `websocket` section of the file named by
//! `OVOS_BUS_CONFIG_FILE`, then the `OVOS_BUS_*` environment variables.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod service;
pub mod ws;

// Re-exports for public API
pub use domain::comments::strip_comments;
pub use domain::config::BusConfig;
pub use domain::{BusError, ConfigError};
pub use service::{BoundBus, MessageBusService, DRAIN_TIMEOUT};
pub use ws::{ConnectionHandler, SHUTDOWN_REASON};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
