//! Configuration loading and validation

use anyhow::Result;
use brewlink_handshake::HandshakeConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub handshake: HandshakeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port the controller is attached to
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
        }
    }
}

fn default_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud() -> u32 {
    brewlink_handshake::DEFAULT_BAUD
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeSection {
    /// Maximum number of protocol-level retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Wall-clock ceiling on the whole handshake in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pause between retries in seconds
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for HandshakeSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_max_retries() -> u32 {
    brewlink_handshake::DEFAULT_MAX_RETRIES
}

fn default_timeout_secs() -> u64 {
    brewlink_handshake::DEFAULT_TIMEOUT.as_secs()
}

fn default_backoff_secs() -> u64 {
    brewlink_handshake::DEFAULT_BACKOFF.as_secs()
}

impl Config {
    /// Convert to the handshake limits
    pub fn to_handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            max_retries: self.handshake.max_retries,
            overall_timeout: Duration::from_secs(self.handshake.timeout_secs),
            retry_backoff: Duration::from_secs(self.handshake.backoff_secs),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
