//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CONTRIBUTORS_*)
//! 2. TOML config file (if CONTRIBUTORS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which cache backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map; contents are lost on restart.
    #[default]
    Memory,
    /// SQLite file at `cache_path`, shareable between processes.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CONTRIBUTORS_*)
/// 2. TOML config file (if CONTRIBUTORS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite contributor store.
    ///
    /// Set via CONTRIBUTORS_STORE_PATH environment variable.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Set via CONTRIBUTORS_CACHE_BACKEND (`memory` or `sqlite`).
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Path to the SQLite cache database, used by the `sqlite` backend.
    ///
    /// Set via CONTRIBUTORS_CACHE_PATH environment variable.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Lifetime of cached contributor snapshots in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Bound on each cache operation in milliseconds.
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    /// Maximum concurrent background cache jobs.
    #[serde(default = "default_max_background_tasks")]
    pub max_background_tasks: usize,

    #[serde(default = "default_list_limit")]
    pub default_list_limit: u32,

    #[serde(default = "default_max_list_limit")]
    pub max_list_limit: u32,

    /// Events buffered per change subscriber before it starts losing the oldest.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Seconds between cache sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./contributors.sqlite")
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./contributors-cache.sqlite")
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_cache_timeout_ms() -> u64 {
    5_000
}

fn default_max_background_tasks() -> usize {
    256
}

fn default_list_limit() -> u32 {
    10
}

fn default_max_list_limit() -> u32 {
    100
}

fn default_event_capacity() -> usize {
    64
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            cache_backend: CacheBackend::default(),
            cache_path: default_cache_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_timeout_ms: default_cache_timeout_ms(),
            max_background_tasks: default_max_background_tasks(),
            default_list_limit: default_list_limit(),
            max_list_limit: default_max_list_limit(),
            event_capacity: default_event_capacity(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CONTRIBUTORS_`
    /// 2. TOML file from `CONTRIBUTORS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CONTRIBUTORS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed("CONTRIBUTORS_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
