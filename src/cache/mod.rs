//! Cache-aside layer for effective permission sets
//!
//! On a hit the stored set is deserialized and returned without touching the
//! catalogs or the principal store; on a miss the resolver runs and the
//! result is stored under a per-principal key before returning. Cache
//! failures degrade to the resolver path on reads and are logged on writes;
//! they never fail the caller.

pub mod keys;
pub mod metrics;
#[cfg(test)]
mod tests;

pub use keys::CacheKeys;
pub use metrics::{CacheMetrics, CacheStats};

use crate::authz::resolver::PermissionResolver;
use crate::authz::types::{EffectivePermissions, Principal};
use crate::storage::{KeyValueCache, PrincipalStore};
use crate::utils::error::{AuthzError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache-aside wrapper around the permission resolver
pub struct CachedResolver {
    resolver: PermissionResolver,
    principals: Arc<dyn PrincipalStore>,
    cache: Arc<dyn KeyValueCache>,
    metrics: Arc<CacheMetrics>,
    keys: CacheKeys,
    principal_ttl_secs: u64,
}

impl CachedResolver {
    /// Create a cached resolver
    pub fn new(
        resolver: PermissionResolver,
        principals: Arc<dyn PrincipalStore>,
        cache: Arc<dyn KeyValueCache>,
        metrics: Arc<CacheMetrics>,
        keys: CacheKeys,
        principal_ttl_secs: u64,
    ) -> Self {
        Self {
            resolver,
            principals,
            cache,
            metrics,
            keys,
            principal_ttl_secs,
        }
    }

    /// Resolve a principal's effective permission set, cache-aside.
    ///
    /// Concurrent misses for the same principal may each recompute and store
    /// the same set; the computation is idempotent and side-effect-free, so
    /// the stampede is benign.
    pub async fn resolve(&self, principal_id: &str) -> Result<EffectivePermissions> {
        let key = self.keys.effective(principal_id);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<EffectivePermissions>(&raw) {
                Ok(effective) => {
                    self.metrics.record_hit();
                    debug!("Cache hit for principal {}", principal_id);
                    return Ok(effective);
                }
                Err(e) => {
                    warn!(
                        "Discarding undecodable cached permission set for {}: {}",
                        principal_id, e
                    );
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.metrics.record_error();
                warn!(
                    "Cache read failed for principal {}, falling back to resolver: {}",
                    principal_id, e
                );
            }
        }

        self.metrics.record_miss();
        let effective = self.resolver.resolve(principal_id).await?;

        match serde_json::to_string(&effective) {
            Ok(raw) => match self
                .cache
                .set(&key, &raw, Some(self.principal_ttl_secs))
                .await
            {
                Ok(()) => self.metrics.record_write(),
                Err(e) => {
                    self.metrics.record_error();
                    warn!("Cache write failed for principal {}: {}", principal_id, e);
                }
            },
            Err(e) => warn!(
                "Failed to serialize permission set for {}: {}",
                principal_id, e
            ),
        }

        Ok(effective)
    }

    /// Check a single permission, admin bypass applied before any lookup
    pub async fn has_permission(&self, principal_id: &str, permission_id: &str) -> Result<bool> {
        let principal = self.load_principal(principal_id).await?;
        if principal.is_admin() {
            return Ok(true);
        }

        let held = self.resolve_ids(principal_id).await?;
        Ok(held.contains(permission_id))
    }

    /// Check whether the principal holds any of the given permissions
    pub async fn has_any(&self, principal_id: &str, permission_ids: &[String]) -> Result<bool> {
        let principal = self.load_principal(principal_id).await?;
        if principal.is_admin() {
            return Ok(true);
        }

        let held = self.resolve_ids(principal_id).await?;
        Ok(permission_ids.iter().any(|id| held.contains(id.as_str())))
    }

    /// Check whether the principal holds all of the given permissions
    pub async fn has_all(&self, principal_id: &str, permission_ids: &[String]) -> Result<bool> {
        let principal = self.load_principal(principal_id).await?;
        if principal.is_admin() {
            return Ok(true);
        }

        let held = self.resolve_ids(principal_id).await?;
        Ok(permission_ids.iter().all(|id| held.contains(id.as_str())))
    }

    /// Drop the cached set for one principal. Failures are logged, not
    /// propagated: the store write already happened and staleness is bounded
    /// by the TTL.
    pub async fn invalidate_principal(&self, principal_id: &str) {
        let key = self.keys.effective(principal_id);
        match self.cache.del(&key).await {
            Ok(()) => {
                self.metrics.record_invalidation();
                debug!("Invalidated cached permissions for {}", principal_id);
            }
            Err(e) => {
                self.metrics.record_error();
                warn!(
                    "Failed to invalidate cached permissions for {}: {}",
                    principal_id, e
                );
            }
        }
    }

    /// Drop the cached set for every principal. Used when a role's
    /// permission set changes: membership is not tracked in reverse, so the
    /// flush is conservative.
    pub async fn invalidate_all_principals(&self) {
        match self
            .cache
            .del_by_pattern(&self.keys.effective_pattern())
            .await
        {
            Ok(count) => {
                self.metrics.record_bulk_invalidation();
                debug!("Flushed {} cached permission sets", count);
            }
            Err(e) => {
                self.metrics.record_error();
                warn!("Failed to flush cached permission sets: {}", e);
            }
        }
    }

    async fn load_principal(&self, principal_id: &str) -> Result<Principal> {
        self.principals
            .find_by_id(principal_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Principal {} not found", principal_id)))
    }

    async fn resolve_ids(&self, principal_id: &str) -> Result<HashSet<String>> {
        let effective = self.resolve(principal_id).await?;
        Ok(effective.into_iter().map(|p| p.id).collect())
    }
}
