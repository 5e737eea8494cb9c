//! Storage layer: record stores and the key-value cache
//!
//! Persistent stores and the cache service are external collaborators; this
//! module defines the seams plus the in-memory and Redis backends.

pub mod kv;
pub mod memory;
pub mod store;

pub use kv::{KeyValueCache, MemoryKv};
#[cfg(feature = "redis")]
pub use kv::RedisKv;
pub use memory::MemoryStore;
pub use store::{PermissionStore, PrincipalStore, RoleStore};
