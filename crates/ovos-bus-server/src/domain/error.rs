//! Server error types.

/// Errors that stop the bus from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Certificate or key could not be loaded
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Listener failed while serving
    #[error("server error: {0}")]
    Serve(String),
}

impl From<crate::domain::config::ConfigError> for BusError {
    fn from(e: crate::domain::config::ConfigError) -> Self {
        BusError::Config(e.to_string())
    }
}
