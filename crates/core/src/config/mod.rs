//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BOOKING_*)
//! 2. TOML config file (if BOOKING_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::expiry::ExpiryPolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BOOKING_*)
/// 2. TOML config file (if BOOKING_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite booking store.
    ///
    /// Set via BOOKING_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding the bundled `booking.json` document.
    ///
    /// Set via BOOKING_RESOURCE_DIR environment variable.
    #[serde(default = "default_resource_dir")]
    pub resource_dir: PathBuf,

    /// Remote URL serving the booking document.
    ///
    /// Set via BOOKING_SOURCE_URL environment variable. When unset the
    /// bundled document is used.
    #[serde(default)]
    pub source_url: Option<String>,

    /// Simulated latency of the bundled source in milliseconds.
    ///
    /// Set via BOOKING_FETCH_DELAY_MS environment variable.
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,

    /// Maximum age of a cached booking in seconds.
    ///
    /// Set via BOOKING_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Interval between background purges in seconds; 0 disables them.
    ///
    /// Set via BOOKING_PURGE_INTERVAL_SECS environment variable.
    #[serde(default)]
    pub purge_interval_secs: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via BOOKING_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via BOOKING_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./booking-cache.sqlite")
}

fn default_resource_dir() -> PathBuf {
    PathBuf::from("./resources")
}

fn default_fetch_delay_ms() -> u64 {
    1_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_user_agent() -> String {
    "booking-cache/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            resource_dir: default_resource_dir(),
            source_url: None,
            fetch_delay_ms: default_fetch_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            purge_interval_secs: 0,
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Expiry policy built from `cache_ttl_secs`.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(Duration::from_secs(self.cache_ttl_secs))
    }

    /// Background purge interval, if enabled.
    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_secs > 0).then(|| Duration::from_secs(self.purge_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BOOKING_`
    /// 2. TOML file from `BOOKING_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("BOOKING_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(Env::prefixed("BOOKING_").ignore(&["CONFIG_FILE"]));

        Self::from_figment(&figment)
    }

    /// Extract and validate configuration from an assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./booking-cache.sqlite"));
        assert_eq!(config.resource_dir, PathBuf::from("./resources"));
        assert!(config.source_url.is_none());
        assert_eq!(config.fetch_delay(), Duration::from_secs(1));
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(config.purge_interval().is_none());
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.user_agent, "booking-cache/0.1");
    }

    #[test]
    fn test_expiry_policy_from_config() {
        let config = AppConfig { cache_ttl_secs: 60, ..Default::default() };
        assert_eq!(config.expiry_policy().cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_purge_interval_enabled() {
        let config = AppConfig { purge_interval_secs: 30, ..Default::default() };
        assert_eq!(config.purge_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(
            r#"
            cache_ttl_secs = 120
            source_url = "https://example.com/booking.json"
            "#,
        ));

        let config = AppConfig::from_figment(&figment).unwrap();
        assert_eq!(config.cache_ttl_secs, 120);
        assert_eq!(config.source_url.as_deref(), Some("https://example.com/booking.json"));
        assert_eq!(config.fetch_delay_ms, 1_000);
    }

    #[test]
    fn test_invalid_layer_is_rejected() {
        let figment =
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("cache_ttl_secs = 0"));
        let result = AppConfig::from_figment(&figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));
    }

    #[test]
    fn test_mistyped_layer_fails_to_load() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(r#"cache_ttl_secs = "soon""#));
        assert!(matches!(AppConfig::from_figment(&figment), Err(ConfigError::LoadFailed(_))));
    }
}
