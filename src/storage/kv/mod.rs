//! Generic key-value cache collaborators
//!
//! The cache store is an external service with GET/SET/DEL/TTL and pattern
//! delete. Everything above this seam treats values as opaque strings.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryKv;
#[cfg(feature = "redis")]
pub use self::redis::RedisKv;

use crate::utils::error::Result;
use async_trait::async_trait;

/// Key-value cache service with per-key TTL and prefix pattern deletion
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Get a value, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a key-value pair with an optional TTL in seconds
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()>;

    /// Delete a key
    async fn del(&self, key: &str) -> Result<()>;

    /// Delete every key matching a `prefix*` pattern. Returns how many keys
    /// were deleted.
    async fn del_by_pattern(&self, pattern: &str) -> Result<u64>;
}
