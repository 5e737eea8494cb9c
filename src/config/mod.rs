//! Configuration management
//!
//! Loading, validation, and defaults for engine configuration.

use crate::utils::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Root configuration for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache TTLs and key namespace
    pub cache: CacheConfig,
    /// Redis connection settings
    pub redis: RedisConfig,
    /// Catalog bootstrap behaviour
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthzError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| AuthzError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Config::default();

        if let Ok(url) = std::env::var("AUTHZD_REDIS_URL") {
            config.redis.url = url;
            config.redis.enabled = true;
        }
        if let Ok(ttl) = std::env::var("AUTHZD_PRINCIPAL_TTL_SECS") {
            config.cache.principal_ttl_secs = ttl
                .parse()
                .map_err(|e| AuthzError::Config(format!("Invalid AUTHZD_PRINCIPAL_TTL_SECS: {}", e)))?;
        }
        if let Ok(ttl) = std::env::var("AUTHZD_LISTING_TTL_SECS") {
            config.cache.listing_ttl_secs = ttl
                .parse()
                .map_err(|e| AuthzError::Config(format!("Invalid AUTHZD_LISTING_TTL_SECS: {}", e)))?;
        }
        if let Ok(prefix) = std::env::var("AUTHZD_CACHE_PREFIX") {
            config.cache.key_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.principal_ttl_secs == 0 {
            return Err(AuthzError::Config(
                "cache.principal_ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache.listing_ttl_secs == 0 {
            return Err(AuthzError::Config(
                "cache.listing_ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache.key_prefix.is_empty() {
            return Err(AuthzError::Config(
                "cache.key_prefix must not be empty".to_string(),
            ));
        }
        if self.redis.enabled && self.redis.url.is_empty() {
            return Err(AuthzError::Config(
                "redis.url must be set when redis is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cache TTLs and key namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for per-principal effective permission sets, in seconds.
    /// Minutes-scale: bounds staleness without thundering reads.
    pub principal_ttl_secs: u64,
    /// TTL for catalog listings, in seconds. Hour-scale: listings change
    /// far less often than per-principal data.
    pub listing_ttl_secs: u64,
    /// Namespace prefix for every cache key
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            principal_ttl_secs: 300,
            listing_ttl_secs: 3600,
            key_prefix: "authz".to_string(),
        }
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
    /// Whether Redis is enabled; when disabled, callers fall back to an
    /// in-process cache or a no-op backend
    pub enabled: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            enabled: false,
        }
    }
}

/// Catalog bootstrap behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Seed the system catalogs on startup when they are empty
    pub enabled: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
