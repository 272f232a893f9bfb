//! Monitor configuration
//!
//! Loads monitor settings from an optional TOML file. Command-line flags are
//! applied on top by the caller.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio_tungstenite::tungstenite::http::Uri;

/// Endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:3000/ws";

/// Default capacity of the connection event channel
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid endpoint '{0}': expected a ws:// or wss:// URL")]
    InvalidEndpoint(String),
    #[error("Event buffer must be greater than zero")]
    InvalidBuffer,
}

/// Settings for a single monitored connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// WebSocket URL to connect to
    pub endpoint: String,
    /// Include the raw payload in message diagnostics
    pub log_payloads: bool,
    /// Capacity of the channel between transport and handler
    pub event_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            log_payloads: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Override the endpoint
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        self
    }

    /// Turn payload logging on or off
    pub fn with_log_payloads(mut self, log_payloads: bool) -> Self {
        self.log_payloads = log_payloads;
        self
    }

    /// Check that the settings can be used to open a connection
    pub fn validate(&self) -> Result<(), ConfigError> {
        let uri: Uri = self
            .endpoint
            .parse()
            .map_err(|_| ConfigError::InvalidEndpoint(self.endpoint.clone()))?;

        match (uri.scheme_str(), uri.host()) {
            (Some("ws") | Some("wss"), Some(host)) if !host.is_empty() => {}
            _ => return Err(ConfigError::InvalidEndpoint(self.endpoint.clone())),
        }

        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidBuffer);
        }

        Ok(())
    }
}
