//! Human-friendly duration and size parsing for environment configuration.
//!
//! Mirrors the `getenv(key, mandatory, default)` helper used throughout the
//! Python settings modules, but typed and panicking only at startup.

use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(String),
    #[error("invalid value for {key}: {source}")]
    Invalid {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub fn duration_var(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(key) {
        Ok(raw) => humantime::parse_duration(&raw).map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            source: Box::new(e),
        }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(ConfigError::Invalid {
            key: key.to_string(),
            source: Box::new(e),
        }),
    }
}

pub fn string_var(key: &str, default: impl Into<String>) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

pub fn required_string_var(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

pub fn u32_var(key: &str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            source: Box::new(e),
        }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(ConfigError::Invalid {
            key: key.to_string(),
            source: Box::new(e),
        }),
    }
}

pub fn size_var(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_size::parse_size(&raw).map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            source: Box::new(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)),
        }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(ConfigError::Invalid {
            key: key.to_string(),
            source: Box::new(e),
        }),
    }
}
