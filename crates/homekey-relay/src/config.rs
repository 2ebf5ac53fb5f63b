//! Configuration file parsing for the relay service.
//!
//! Loads settings from TOML files: bind address, request ceiling, stream
//! buffering, an optional catalog override and the model provider. The
//! provider credential is never stored in the file; `model.api_key_env`
//! names the environment variable that holds it.

use homekey_llm::openai::{DEFAULT_BASE_URL, DEFAULT_BUFFER, DEFAULT_MODEL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `model.model`
pub const MODEL_ENV: &str = "HOMEKEY_MODEL";

/// Environment variable overriding the bind address (`host:port`)
pub const BIND_ENV: &str = "HOMEKEY_BIND";

/// Relay configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Relay configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 3000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Wall-clock ceiling for one chat request, model round-trip included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Capacity of the chunk channel between model and client
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,

    /// Intelligence table to load instead of the built-in one
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Model provider settings
    #[serde(default)]
    pub model: ModelConfig,
}

/// Model provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// API root (e.g., "https://api.openai.com/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier (e.g., "gpt-4o")
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3000
}

/// Default request ceiling: 30 seconds
fn default_request_timeout() -> u64 {
    30
}

fn default_stream_buffer() -> usize {
    DEFAULT_BUFFER
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl ModelConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    /// Read the API key through `lookup` (injectable for tests)
    pub fn api_key_from<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField(self.api_key_env.clone()))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            request_timeout_secs: default_request_timeout(),
            stream_buffer: default_stream_buffer(),
            catalog_path: None,
            model: ModelConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOMEKEY_MODEL` and `HOMEKEY_BIND` from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides through `lookup` (injectable for tests)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(MODEL_ENV) {
            self.model.model = model;
        }
        if let Some(bind) = lookup(BIND_ENV) {
            self.set_bind(&bind)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Set address and port from a `host:port` string
    pub fn set_bind(&mut self, bind: &str) -> Result<(), ConfigError> {
        let (address, port) = bind
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::Invalid(format!("bind '{}' is not host:port", bind)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bind port '{}' is not a number", port)))?;

        self.bind_address = address.to_string();
        self.bind_port = port;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.stream_buffer == 0 {
            return Err(ConfigError::Invalid(
                "stream_buffer must be greater than 0".to_string(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::MissingField("model.model".to_string()));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(ConfigError::MissingField("model.api_key_env".to_string()));
        }
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Request ceiling as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
