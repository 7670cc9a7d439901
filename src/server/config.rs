//! Configuration management for the relay server
//!
//! Built-in defaults, overlaid by an optional `config.toml`, overlaid by
//! `RELAY_*` environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 10319;
pub const DEFAULT_MAX_CLIENTS: usize = 64;
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 4096;

/// Relay server configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// IP address to listen on
    pub bind_address: String,

    /// TCP port to listen on. `0` picks an ephemeral port.
    pub port: u16,

    /// Maximum concurrently registered sessions
    pub max_clients: usize,

    /// Frames queued per recipient before it is dropped as unresponsive
    pub outbound_capacity: usize,

    /// Longest accepted inbound frame in bytes, excluding the newline
    pub max_frame_length: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl RelayConfig {
    /// Load configuration from ./config.toml (if present) with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the named file (extension optional, file optional)
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("max_clients", DEFAULT_MAX_CLIENTS as i64)?
            .set_default("outbound_capacity", DEFAULT_OUTBOUND_CAPACITY as i64)?
            .set_default("max_frame_length", DEFAULT_MAX_FRAME_LENGTH as i64)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("RELAY").try_parsing(true))
            .build()?;

        let config: RelayConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "bind_address cannot be empty".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.outbound_capacity == 0 {
            return Err(config::ConfigError::Message(
                "outbound_capacity must be greater than 0".into(),
            ));
        }

        if self.max_frame_length == 0 {
            return Err(config::ConfigError::Message(
                "max_frame_length must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and port as a socket address string
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
