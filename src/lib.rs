//! # authzd
//!
//! Role and permission resolution engine with cache-aside effective-permission
//! caching.
//!
//! A principal's *effective* permission set is computed from three
//! overlapping sources: direct grants, role-derived grants, and a legacy
//! flat permission-id list pending one-time migration. The engine keeps the
//! derived set coherent under concurrent mutation, bootstraps the permission
//! and role catalogs idempotently, and answers request-time authorization
//! checks fail-closed.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use authzd::{AccessControl, Config, Principal, RequireMode, SystemRole};
//!
//! #[tokio::main]
//! async fn main() -> authzd::Result<()> {
//!     let engine = AccessControl::in_memory(&Config::default());
//!     engine.bootstrap().await?;
//!
//!     let admin = engine
//!         .create_principal(Principal::new("u-1").with_system_role(SystemRole::Admin))
//!         .await?;
//!     assert!(engine.authorize_one(&admin.id, "users.update").await);
//!
//!     let viewer = engine.create_principal(Principal::new("u-2")).await?;
//!     engine
//!         .assign_direct_permissions(&viewer.id, &["content.read".to_string()])
//!         .await?;
//!     assert!(
//!         engine
//!             .authorize(
//!                 &viewer.id,
//!                 &["content.read".to_string(), "content.update".to_string()],
//!                 RequireMode::Any,
//!             )
//!             .await
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Production deployments inject real backends: any document or relational
//! store behind the [`storage`] traits, and Redis (or any key-value service
//! with TTL and pattern delete) behind [`storage::KeyValueCache`].

#![warn(clippy::all)]

pub mod authz;
pub mod cache;
pub mod config;
pub mod storage;
pub mod utils;

// Re-export main types
pub use authz::{
    AccessControl, AuthorizationGuard, EffectivePermissions, LegacyMigration, MigrationReport,
    Permission, PermissionAction, PermissionCatalog, PermissionGrants, PermissionResolver,
    Principal, RequireMode, Role, RoleCatalog, SystemRole,
};
pub use cache::{CacheMetrics, CacheStats, CachedResolver};
pub use config::Config;
pub use utils::error::{AuthzError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, "authzd");
    }
}
