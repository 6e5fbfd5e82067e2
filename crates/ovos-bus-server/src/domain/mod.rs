//! Domain layer - configuration and errors.

pub mod comments;
pub mod config;
pub mod error;

pub use config::{BusConfig, ConfigError};
pub use error::BusError;
