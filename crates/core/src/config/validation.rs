//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
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
    /// - `scope` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `network_timeout_ms` is less than 100ms or exceeds 2 minutes
    /// - `version_check_interval_secs` is 0 or exceeds one week
    /// - `cache_prefix` is empty or `fallback_cache_version` does not start with it
    /// - `user_agent`, `version_path` or `dataset_path` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scope_url()?;

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if self.network_timeout_ms < 100 {
            return Err(invalid("network_timeout_ms", "must be at least 100ms"));
        }
        if self.network_timeout_ms > 120_000 {
            return Err(invalid("network_timeout_ms", "must not exceed 2 minutes (120000ms)"));
        }

        if self.version_check_interval_secs == 0 {
            return Err(invalid("version_check_interval_secs", "must be greater than 0"));
        }
        if self.version_check_interval_secs > 7 * 24 * 3600 {
            return Err(invalid("version_check_interval_secs", "must not exceed one week"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if !self.fallback_cache_version.starts_with(&self.cache_prefix) {
            return Err(invalid("fallback_cache_version", "must start with cache_prefix"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.version_path.is_empty() {
            return Err(invalid("version_path", "must not be empty"));
        }
        if self.dataset_path.is_empty() {
            return Err(invalid("dataset_path", "must not be empty"));
        }

        if self.precache.is_empty() {
            tracing::warn!("precache list is empty; the app shell will not be available offline until visited");
        }

        Ok(())
    }
}
