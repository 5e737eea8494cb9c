//! Access-control facade
//!
//! Wires the catalogs, resolver, cache layer, migration runner, and guard
//! over injected store and cache backends, and exposes the operations the
//! API layer consumes.

use super::catalog::{PermissionCatalog, RoleCatalog};
use super::guard::{AuthorizationGuard, RequireMode};
use super::migration::{LegacyMigration, MigrationReport};
use super::resolver::PermissionResolver;
use super::types::{EffectivePermissions, PermissionGrants, Principal};
use crate::cache::{CacheKeys, CacheMetrics, CacheStats, CachedResolver};
use crate::config::Config;
use crate::storage::{
    KeyValueCache, MemoryKv, MemoryStore, PermissionStore, PrincipalStore, RoleStore,
};
use crate::utils::error::{AuthzError, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Access-control engine: permission resolution, caching, and authorization
pub struct AccessControl {
    principals: Arc<dyn PrincipalStore>,
    permissions: PermissionCatalog,
    roles: RoleCatalog,
    resolver: Arc<CachedResolver>,
    migration: LegacyMigration,
    guard: AuthorizationGuard,
    metrics: Arc<CacheMetrics>,
    bootstrap_enabled: bool,
}

impl AccessControl {
    /// Create an engine over injected store and cache backends
    pub fn new(
        config: &Config,
        permission_store: Arc<dyn PermissionStore>,
        role_store: Arc<dyn RoleStore>,
        principal_store: Arc<dyn PrincipalStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Self {
        info!("Initializing access-control engine");

        let metrics = Arc::new(CacheMetrics::new());
        let keys = CacheKeys::new(config.cache.key_prefix.as_str());

        let permissions = PermissionCatalog::new(
            permission_store,
            Arc::clone(&cache),
            Arc::clone(&metrics),
            keys.clone(),
            config.cache.listing_ttl_secs,
        );
        let roles = RoleCatalog::new(
            role_store,
            permissions.clone(),
            Arc::clone(&cache),
            Arc::clone(&metrics),
            keys.clone(),
            config.cache.listing_ttl_secs,
        );
        let resolver = PermissionResolver::new(
            Arc::clone(&principal_store),
            permissions.clone(),
            roles.clone(),
        );
        let cached = Arc::new(CachedResolver::new(
            resolver,
            Arc::clone(&principal_store),
            cache,
            Arc::clone(&metrics),
            keys,
            config.cache.principal_ttl_secs,
        ));
        let migration = LegacyMigration::new(
            Arc::clone(&principal_store),
            permissions.clone(),
            Arc::clone(&cached),
        );
        let guard = AuthorizationGuard::new(Arc::clone(&cached));

        Self {
            principals: principal_store,
            permissions,
            roles,
            resolver: cached,
            migration,
            guard,
            metrics,
            bootstrap_enabled: config.bootstrap.enabled,
        }
    }

    /// Create an engine over in-memory backends, for tests and embedded use
    pub fn in_memory(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryKv::new());

        Self::new(
            config,
            Arc::clone(&store) as Arc<dyn PermissionStore>,
            Arc::clone(&store) as Arc<dyn RoleStore>,
            store as Arc<dyn PrincipalStore>,
            cache as Arc<dyn KeyValueCache>,
        )
    }

    /// Seed the system catalogs when they are empty. Idempotent.
    pub async fn bootstrap(&self) -> Result<()> {
        if !self.bootstrap_enabled {
            debug!("Catalog bootstrap disabled by configuration");
            return Ok(());
        }
        self.roles.bootstrap().await
    }

    /// Resolve a principal's effective permission set through the cache
    pub async fn resolve_effective_permissions(
        &self,
        principal_id: &str,
    ) -> Result<EffectivePermissions> {
        self.resolver.resolve(principal_id).await
    }

    /// Allow/deny a set of required permissions. Fail-closed.
    pub async fn authorize(
        &self,
        principal_id: &str,
        required: &[String],
        mode: RequireMode,
    ) -> bool {
        self.guard.authorize(principal_id, required, mode).await
    }

    /// Allow/deny a single required permission. Fail-closed.
    pub async fn authorize_one(&self, principal_id: &str, permission_id: &str) -> bool {
        self.guard.authorize_one(principal_id, permission_id).await
    }

    /// Register a principal
    pub async fn create_principal(&self, principal: Principal) -> Result<Principal> {
        if !self.principals.insert(&principal).await? {
            return Err(AuthzError::Conflict(format!(
                "Principal {} already exists",
                principal.id
            )));
        }
        Ok(principal)
    }

    /// Get a principal by id
    pub async fn get_principal(&self, principal_id: &str) -> Result<Principal> {
        self.principals
            .find_by_id(principal_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Principal {} not found", principal_id)))
    }

    /// Replace a principal's direct permission set wholesale.
    ///
    /// Ids are validated against the catalog; unknown ids fail the call with
    /// the offending ids. On an unmigrated principal the explicit assignment
    /// is authoritative and completes the legacy transition.
    pub async fn assign_direct_permissions(
        &self,
        principal_id: &str,
        permission_ids: &[String],
    ) -> Result<Principal> {
        let mut principal = self.get_principal(principal_id).await?;
        let validated = self.validate_permission_ids(permission_ids).await?;

        principal.grants = PermissionGrants::Direct {
            permission_ids: validated,
        };
        principal.updated_at = Utc::now();

        if !self.principals.update(&principal).await? {
            return Err(AuthzError::NotFound(format!(
                "Principal {} not found",
                principal_id
            )));
        }
        self.resolver.invalidate_principal(principal_id).await;

        Ok(principal)
    }

    /// Replace a principal's role set wholesale. Role ids are validated;
    /// unknown ids fail the call with the offending ids.
    pub async fn assign_roles(
        &self,
        principal_id: &str,
        role_ids: &[String],
    ) -> Result<Principal> {
        let mut principal = self.get_principal(principal_id).await?;

        let mut offending = Vec::new();
        for role_id in role_ids {
            if self.roles.find_by_id(role_id).await?.is_none() {
                offending.push(role_id.clone());
            }
        }
        if !offending.is_empty() {
            return Err(AuthzError::validation("unknown role ids", offending));
        }

        principal.roles = role_ids.iter().cloned().collect();
        principal.updated_at = Utc::now();

        if !self.principals.update(&principal).await? {
            return Err(AuthzError::NotFound(format!(
                "Principal {} not found",
                principal_id
            )));
        }
        self.resolver.invalidate_principal(principal_id).await;

        Ok(principal)
    }

    /// Convert one principal's legacy permission list to direct references
    pub async fn migrate_legacy_permissions(&self, principal_id: &str) -> Result<Principal> {
        self.migration.migrate(principal_id).await
    }

    /// Convert every pending legacy permission list, tolerating
    /// per-principal failures
    pub async fn migrate_all_legacy(&self) -> Result<MigrationReport> {
        self.migration.migrate_all().await
    }

    /// Permission catalog operations
    pub fn permissions(&self) -> &PermissionCatalog {
        &self.permissions
    }

    /// Role catalog operations
    pub fn roles(&self) -> &RoleCatalog {
        &self.roles
    }

    /// The request-time guard
    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    /// Snapshot of the cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    async fn validate_permission_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let found: HashSet<String> = self
            .permissions
            .get_by_ids(ids)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let offending: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();

        if !offending.is_empty() {
            return Err(AuthzError::validation("unknown permission ids", offending));
        }

        Ok(found)
    }
}
