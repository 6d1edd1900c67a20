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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is 0 or exceeds one day
    /// - `fetch_delay_ms` exceeds one minute
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `source_url` is set but is not an http(s) URL
    ///
    /// Returns `ConfigError::Missing` if `resource_dir` is empty while no
    /// `source_url` is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must be greater than 0".into() });
        }
        if self.cache_ttl_secs > 86_400 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must not exceed one day (86400s)".into(),
            });
        }

        if self.fetch_delay_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "fetch_delay_ms".into(),
                reason: "must not exceed one minute (60000ms)".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        match self.source_url.as_deref() {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                return Err(ConfigError::Invalid {
                    field: "source_url".into(),
                    reason: "must be an http:// or https:// URL".into(),
                });
            }
            Some(_) => {}
            None => {
                if self.resource_dir.as_os_str().is_empty() {
                    return Err(ConfigError::Missing {
                        field: "resource_dir".into(),
                        hint: "Set BOOKING_RESOURCE_DIR or BOOKING_SOURCE_URL".into(),
                    });
                }
            }
        }

        Ok(())
    }
}
