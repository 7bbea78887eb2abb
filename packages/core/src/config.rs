//! Configuration
//!
//! Settings are read from `DRIVELINK_*` environment variables, falling back to
//! defaults suitable for local development.
//!
//! | Variable | Default |
//! |---|---|
//! | `DRIVELINK_BIND_ADDR` | `127.0.0.1` |
//! | `DRIVELINK_PORT` | `3001` |
//! | `DRIVELINK_DEFAULT_USER` | `guest` |
//! | `DRIVELINK_TX_MAX_RETRIES` | `3` |
//! | `DRIVELINK_TX_RETRY_BACKOFF_MS` | `25` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on commit retries; more than this points at a livelock
const MAX_SUPPORTED_RETRIES: u32 = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Retry policy for [`TransactionCoordinator`](crate::transaction::TransactionCoordinator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Extra attempts after a commit conflict
    pub max_retries: u32,

    /// Base backoff between attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 25,
        }
    }
}

impl TransactionConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub bind_addr: String,

    /// Port to listen on
    pub port: u16,

    /// User requests run as when no `X-Remote-User` header is sent
    pub default_user: String,

    pub transaction: TransactionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 3001,
            default_user: "guest".to_string(),
            transaction: TransactionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            bind_addr: lookup("DRIVELINK_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_var(&lookup, "DRIVELINK_PORT")?.unwrap_or(defaults.port),
            default_user: lookup("DRIVELINK_DEFAULT_USER").unwrap_or(defaults.default_user),
            transaction: TransactionConfig {
                max_retries: parse_var(&lookup, "DRIVELINK_TX_MAX_RETRIES")?
                    .unwrap_or(defaults.transaction.max_retries),
                retry_backoff_ms: parse_var(&lookup, "DRIVELINK_TX_RETRY_BACKOFF_MS")?
                    .unwrap_or(defaults.transaction.retry_backoff_ms),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_addr cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".to_string()));
        }

        if self.default_user.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_user cannot be empty".to_string(),
            ));
        }

        if self.transaction.max_retries > MAX_SUPPORTED_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "max_retries cannot exceed {}",
                MAX_SUPPORTED_RETRIES
            )));
        }

        Ok(())
    }

    /// `host:port` to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid_value(key, raw)),
    }
}
