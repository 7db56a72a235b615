//! Application Configuration
//!
//! Every section has a `Default` and a `from_env()` constructor.
//! Unset variables keep their default; malformed values are an error.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::game::actions::GameConfig;
use crate::network::server::ServerConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// Read `key` from the environment, parsing it when set.
pub fn env_var<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                value,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Read `key` from the environment, or return `default`.
pub fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_var(key)?.unwrap_or(default))
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Database file. `None` keeps all state in memory.
    pub db_path: Option<PathBuf>,
    /// JSON file the item catalog is seeded from.
    pub catalog_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: Some(PathBuf::from("clicker.db")),
            catalog_path: PathBuf::from("data/items.json"),
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    ///
    /// An empty `CLICKER_DB_PATH` selects the in-memory store.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let db_path = match std::env::var("CLICKER_DB_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => defaults.db_path,
        };

        Ok(Self {
            db_path,
            catalog_path: env_or("CLICKER_CATALOG_PATH", defaults.catalog_path)?,
        })
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// HTTP server.
    pub server: ServerConfig,
    /// Game rules.
    pub game: GameConfig,
    /// Persistence.
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            game: GameConfig::from_env()?,
            storage: StorageConfig::from_env()?,
        })
    }
}
