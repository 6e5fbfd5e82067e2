//! Bus configuration with layered loading and validation.
//!
//! Resolution order, later layers win:
//!
//! 1. built-in defaults (`ws://127.0.0.1:8181/core`, 25 MiB messages)
//! 2. the `websocket` block of the file named by `OVOS_BUS_CONFIG_FILE`
//! 3. `OVOS_BUS_*` environment variables
//!
//! A missing, unreadable or unparseable file never stops the bus; it is
//! logged and the previous layer is kept.

use crate::domain::comments::strip_comments;
use ovos_bus_core::DEFAULT_CHANNEL_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ENV_CONFIG_FILE: &str = "OVOS_BUS_CONFIG_FILE";
pub const ENV_HOST: &str = "OVOS_BUS_HOST";
pub const ENV_PORT: &str = "OVOS_BUS_PORT";
pub const ENV_ROUTE: &str = "OVOS_BUS_ROUTE";
pub const ENV_MAX_MSG_SIZE: &str = "OVOS_BUS_MAX_MSG_SIZE";
/// Enables TLS for any value except `false` or `0` (case-insensitive).
/// Older releases enabled TLS whenever the variable was set at all, so
/// `OVOS_BUS_USE_SSL=false` used to mean TLS on.
pub const ENV_USE_SSL: &str = "OVOS_BUS_USE_SSL";
pub const ENV_SSL_CERT: &str = "OVOS_BUS_SSL_CERT";
pub const ENV_SSL_KEY: &str = "OVOS_BUS_SSL_KEY";

const BYTES_PER_MIB: usize = 1024 * 1024;

/// Message bus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bind host, IP address or resolvable name
    pub host: String,
    /// Port (default: 8181)
    pub port: u16,
    /// WebSocket path (default: /core)
    pub route: String,
    /// Serve wss:// instead of ws://
    pub ssl: bool,
    /// Max message size in MiB
    pub max_msg_size: u32,
    /// PEM certificate chain, required with `ssl`
    pub ssl_cert: Option<PathBuf>,
    /// PEM private key, required with `ssl`
    pub ssl_key: Option<PathBuf>,
    /// Frames buffered per client before a slow client loses some
    pub channel_capacity: usize,
    /// Remaining keys of the `websocket` block
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8181,
            route: "/core".to_string(),
            ssl: false,
            max_msg_size: 25,
            ssl_cert: None,
            ssl_key: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            extra: HashMap::new(),
        }
    }
}

/// Top level of a config file. Everything but `websocket` is ignored.
#[derive(Deserialize)]
struct ConfigDocument {
    websocket: Option<WebSocketSection>,
}

#[derive(Deserialize)]
struct WebSocketSection {
    host: Option<String>,
    port: Option<u16>,
    route: Option<String>,
    ssl: Option<bool>,
    max_msg_size: Option<u32>,
    ssl_cert: Option<PathBuf>,
    ssl_key: Option<PathBuf>,
    channel_capacity: Option<usize>,
    #[serde(flatten)]
    extra: HashMap<String, serde_yaml::Value>,
}

impl BusConfig {
    /// Load from the process environment.
    pub fn load() -> Self {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` as the environment.
    pub fn load_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_CONFIG_FILE) {
            config = Self::load_file(Path::new(&path), config);
        }

        config.apply_env(&lookup);
        config
    }

    /// Layer a config file over `base`, keeping `base` on any failure.
    fn load_file(path: &Path, base: BusConfig) -> BusConfig {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                return base;
            }
        };

        match Self::from_document(&contents, &base) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config file");
                config
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config file, using defaults"
                );
                base
            }
        }
    }

    /// Parse a YAML or JSON document and layer its `websocket` block over `base`.
    ///
    /// Documents that only parse once comments are removed (commented JSON,
    /// as in `mycroft.conf`) are accepted.
    pub fn from_document(contents: &str, base: &BusConfig) -> Result<BusConfig, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(base.clone());
        }

        let document = match serde_yaml::from_str::<ConfigDocument>(contents) {
            Ok(document) => document,
            Err(first) => {
                debug!(error = %first, "Config did not parse as is, retrying without comments");
                let cleaned = strip_comments(contents);
                if cleaned.trim().is_empty() {
                    return Ok(base.clone());
                }
                serde_yaml::from_str::<ConfigDocument>(&cleaned)
                    .map_err(|e| ConfigError::Parse(e.to_string()))?
            }
        };

        let mut config = base.clone();
        if let Some(section) = document.websocket {
            config.apply_section(section);
        }
        Ok(config)
    }

    fn apply_section(&mut self, section: WebSocketSection) {
        if let Some(host) = section.host {
            self.host = host;
        }
        if let Some(port) = section.port {
            self.port = port;
        }
        if let Some(route) = section.route {
            self.route = route;
        }
        if let Some(ssl) = section.ssl {
            self.ssl = ssl;
        }
        if let Some(max_msg_size) = section.max_msg_size {
            self.max_msg_size = max_msg_size;
        }
        if section.ssl_cert.is_some() {
            self.ssl_cert = section.ssl_cert;
        }
        if section.ssl_key.is_some() {
            self.ssl_key = section.ssl_key;
        }
        if let Some(capacity) = section.channel_capacity {
            self.channel_capacity = capacity;
        }
        self.extra = section.extra;
    }

    fn apply_env<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            match port.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid {}", ENV_PORT),
            }
        }
        if let Some(size) = lookup(ENV_MAX_MSG_SIZE) {
            match size.trim().parse() {
                Ok(size) => self.max_msg_size = size,
                Err(_) => warn!(value = %size, "Ignoring invalid {}", ENV_MAX_MSG_SIZE),
            }
        }
        if let Some(route) = lookup(ENV_ROUTE) {
            self.route = route;
        }
        if let Some(flag) = lookup(ENV_USE_SSL) {
            self.ssl = flag.to_lowercase() != "false" && flag != "0";
        }
        if let Some(cert) = lookup(ENV_SSL_CERT) {
            self.ssl_cert = Some(PathBuf::from(cert));
        }
        if let Some(key) = lookup(ENV_SSL_KEY) {
            self.ssl_key = Some(PathBuf::from(key));
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.route.starts_with('/') {
            return Err(ConfigError::InvalidRoute(format!(
                "{:?} must start with '/'",
                self.route
            )));
        }
        if let Some(bad) = self
            .route
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, ':' | '*' | '{' | '}'))
        {
            return Err(ConfigError::InvalidRoute(format!(
                "{:?} contains {:?}",
                self.route, bad
            )));
        }

        if self.max_msg_size == 0 {
            return Err(ConfigError::InvalidLimit("max_msg_size cannot be 0".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "channel_capacity cannot be 0".into(),
            ));
        }

        if self.ssl && (self.ssl_cert.is_none() || self.ssl_key.is_none()) {
            return Err(ConfigError::MissingTlsMaterial);
        }

        Ok(())
    }

    /// Max message size in bytes.
    pub fn max_message_bytes(&self) -> usize {
        (self.max_msg_size as usize).saturating_mul(BYTES_PER_MIB)
    }

    pub fn scheme(&self) -> &'static str {
        if self.ssl {
            "wss"
        } else {
            "ws"
        }
    }

    /// Client-facing URL, e.g. `ws://127.0.0.1:8181/core`.
    pub fn endpoint(&self) -> String {
        format_endpoint(self.scheme(), &self.host, self.port, &self.route)
    }
}

pub(crate) fn format_endpoint(scheme: &str, host: &str, port: u16, route: &str) -> String {
    if host.contains(':') {
        format!("{}://[{}]:{}{}", scheme, host, port, route)
    } else {
        format!("{}://{}:{}{}", scheme, host, port, route)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Config document is neither YAML nor (commented) JSON
    #[error("invalid config document: {0}")]
    Parse(String),
    /// Route unusable as a URL path
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// `ssl` set without certificate and key
    #[error("ssl requires both ssl_cert and ssl_key")]
    MissingTlsMaterial,
}
