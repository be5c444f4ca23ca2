//! Server configuration from environment variables.
//!
//! `.env` is loaded by `main` before [`ServerConfig::from_env`] runs. Every
//! key is optional; a value that is present but malformed is an error rather
//! than a silent fallback to the default.

use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ELEMENT_FLUSH_INTERVAL_MS: u64 = 100;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Postgres URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Period of the background dirty-element flush.
    pub flush_interval: Duration,
    /// Outbound frame queue per websocket client.
    pub client_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            flush_interval: Duration::from_millis(DEFAULT_ELEMENT_FLUSH_INTERVAL_MS),
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any key that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a key to its raw value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any key that does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let flush_ms = parse(&lookup, "ELEMENT_FLUSH_INTERVAL_MS", DEFAULT_ELEMENT_FLUSH_INTERVAL_MS)?;
        if flush_ms == 0 {
            return Err(ConfigError::Invalid { key: "ELEMENT_FLUSH_INTERVAL_MS", value: "0".into() });
        }
        let capacity = parse(&lookup, "CLIENT_CHANNEL_CAPACITY", defaults.client_channel_capacity)?;
        if capacity == 0 {
            return Err(ConfigError::Invalid { key: "CLIENT_CHANNEL_CAPACITY", value: "0".into() });
        }

        Ok(Self {
            port: parse(&lookup, "PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            flush_interval: Duration::from_millis(flush_ms),
            client_channel_capacity: capacity,
        })
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
