//! Store and process configuration.
//!
//! # Responsibility
//! - Describe connection-pool sizing and the per-operation timeout.
//! - Load optional TOML configuration files for the CLI caller.
//!
//! # Invariants
//! - Every field has a default, so an empty file is a valid configuration.
//! - Pool sizing never reaches the store contract beyond "checkout may fail".

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_OPEN_CONNS: u32 = 25;
const DEFAULT_MAX_IDLE_CONNS: u32 = 25;
const DEFAULT_MAX_IDLE_TIME_SECS: u64 = 15 * 60;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 3_000;

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Connection pool and timeout settings for the item store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Upper bound on pooled connections.
    pub max_open_conns: u32,
    /// Idle connections the pool keeps open (r2d2 `min_idle`), clamped to
    /// `max_open_conns`. Unlike a cap on idle connections this is a floor:
    /// that many connections are opened when the pool is built and
    /// replenished afterwards. Idle connections above it are closed after
    /// `max_idle_time_secs`.
    pub max_idle_conns: u32,
    /// Seconds an idle connection above the `max_idle_conns` floor survives.
    pub max_idle_time_secs: u64,
    /// Milliseconds one store operation may take, pool checkout included.
    pub operation_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_open_conns: DEFAULT_MAX_OPEN_CONNS,
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            max_idle_time_secs: DEFAULT_MAX_IDLE_TIME_SECS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn max_idle_time(&self) -> Duration {
        Duration::from_secs(self.max_idle_time_secs)
    }

    /// Rejects settings r2d2 or the timeout guard cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_conns == 0 {
            return Err(ConfigError::Invalid("max_open_conns must be at least 1"));
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "operation_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Process-level configuration used by the command line caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite database file. `None` means an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.store.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
