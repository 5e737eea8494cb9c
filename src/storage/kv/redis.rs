//! Redis-backed key-value cache
//!
//! Multiplexed connection with a no-op mode for when Redis is unavailable;
//! callers degrade to the backing store rather than failing.

use super::KeyValueCache;
use crate::config::RedisConfig;
use crate::utils::error::{AuthzError, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, AsyncIter, Client, aio::MultiplexedConnection};
use tracing::{debug, info};

/// Redis cache backend (supports no-op mode when Redis is unavailable)
#[derive(Debug, Clone)]
pub struct RedisKv {
    /// Connection handle (None in no-op mode)
    connection: Option<MultiplexedConnection>,
}

impl RedisKv {
    /// Connect to Redis
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to Redis at {}", Self::sanitize_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(AuthzError::Redis)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(AuthzError::Redis)?;

        info!("Redis connection established");
        Ok(Self {
            connection: Some(connection),
        })
    }

    /// Create a no-op backend (for when Redis is unavailable)
    pub fn create_noop() -> Self {
        info!("Creating no-op Redis backend (Redis unavailable)");
        Self { connection: None }
    }

    /// Whether this is a no-op backend
    pub fn is_noop(&self) -> bool {
        self.connection.is_none()
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = match &self.connection {
            Some(conn) => conn.clone(),
            None => {
                debug!("Redis health check skipped (no-op mode)");
                return Ok(());
            }
        };

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(AuthzError::Redis)?;
        Ok(())
    }

    /// Sanitize a Redis URL for logging (hide password)
    fn sanitize_url(url: &str) -> String {
        if let Ok(parsed) = url::Url::parse(url) {
            let mut sanitized = parsed.clone();
            if sanitized.password().is_some() {
                let _ = sanitized.set_password(Some("***"));
            }
            sanitized.to_string()
        } else {
            "invalid_url".to_string()
        }
    }
}

#[async_trait]
impl KeyValueCache for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = match &self.connection {
            Some(conn) => conn.clone(),
            None => return Ok(None),
        };

        let value: Option<String> = conn.get(key).await.map_err(AuthzError::Redis)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = match &self.connection {
            Some(conn) => conn.clone(),
            None => return Ok(()),
        };

        match ttl_secs {
            Some(ttl) => {
                let _: () = conn
                    .set_ex(key, value, ttl)
                    .await
                    .map_err(AuthzError::Redis)?;
            }
            None => {
                let _: () = conn.set(key, value).await.map_err(AuthzError::Redis)?;
            }
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = match &self.connection {
            Some(conn) => conn.clone(),
            None => return Ok(()),
        };

        let _: () = conn.del(key).await.map_err(AuthzError::Redis)?;
        Ok(())
    }

    async fn del_by_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = match &self.connection {
            Some(conn) => conn.clone(),
            None => return Ok(0),
        };

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter: AsyncIter<'_, String> =
                conn.scan_match(pattern).await.map_err(AuthzError::Redis)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let _: () = conn.del(&keys).await.map_err(AuthzError::Redis)?;
        debug!("Deleted {} keys matching {}", keys.len(), pattern);
        Ok(keys.len() as u64)
    }
}
