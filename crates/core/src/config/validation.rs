//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, CacheBackend};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is 0
    /// - `cache_timeout_ms` is below 10ms or not shorter than the TTL
    /// - `max_background_tasks`, `event_capacity` or `sweep_interval_secs` is 0
    /// - `max_list_limit` is 0 or smaller than `default_list_limit`
    /// - `store_path` is empty, or `cache_path` is empty with the sqlite backend
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }

        if self.cache_timeout_ms < 10 {
            return Err(invalid("cache_timeout_ms", "must be at least 10ms"));
        }
        if self.cache_timeout() >= self.cache_ttl() {
            return Err(invalid("cache_timeout_ms", "must be shorter than cache_ttl_secs"));
        }

        if self.max_background_tasks == 0 {
            return Err(invalid("max_background_tasks", "must be greater than 0"));
        }

        if self.max_list_limit == 0 {
            return Err(invalid("max_list_limit", "must be greater than 0"));
        }
        if self.default_list_limit > self.max_list_limit {
            return Err(invalid("default_list_limit", "must not exceed max_list_limit"));
        }

        if self.event_capacity == 0 {
            return Err(invalid("event_capacity", "must be greater than 0"));
        }

        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be greater than 0"));
        }

        if self.store_path.as_os_str().is_empty() {
            return Err(invalid("store_path", "must not be empty"));
        }
        if self.cache_backend == CacheBackend::Sqlite && self.cache_path.as_os_str().is_empty() {
            return Err(invalid("cache_path", "must not be empty when cache_backend is sqlite"));
        }

        if self.sweep_interval() > self.cache_ttl() {
            tracing::warn!(
                sweep_interval_secs = self.sweep_interval_secs,
                cache_ttl_secs = self.cache_ttl_secs,
                "sweep interval exceeds cache TTL; expired entries linger until the next sweep"
            );
        }

        Ok(())
    }
}
