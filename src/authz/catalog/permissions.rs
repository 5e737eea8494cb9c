//! Permission catalog: canonical registry of permission definitions

use crate::authz::types::{Permission, PermissionAction};
use crate::cache::{CacheKeys, CacheMetrics};
use crate::storage::{KeyValueCache, PermissionStore};
use crate::utils::error::{AuthzError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Canonical registry of permission definitions
#[derive(Clone)]
pub struct PermissionCatalog {
    store: Arc<dyn PermissionStore>,
    cache: Arc<dyn KeyValueCache>,
    metrics: Arc<CacheMetrics>,
    keys: CacheKeys,
    listing_ttl_secs: u64,
}

impl PermissionCatalog {
    /// Create a catalog over the given store and cache
    pub fn new(
        store: Arc<dyn PermissionStore>,
        cache: Arc<dyn KeyValueCache>,
        metrics: Arc<CacheMetrics>,
        keys: CacheKeys,
        listing_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            keys,
            listing_ttl_secs,
        }
    }

    /// Seed the catalog with the well-known permission set. No-op when any
    /// permissions already exist; safe to run from concurrently booting
    /// instances because inserts go through `insert_if_absent`.
    pub async fn bootstrap(&self) -> Result<()> {
        if self.store.count().await? > 0 {
            debug!("Permission catalog already seeded, skipping bootstrap");
            return Ok(());
        }

        let mut inserted = 0usize;
        for permission in default_permissions() {
            if self.store.insert_if_absent(&permission).await? {
                inserted += 1;
            }
        }

        info!("Seeded permission catalog with {} permissions", inserted);
        Ok(())
    }

    /// List all permissions, read-through cached
    pub async fn get_all(&self) -> Result<Vec<Permission>> {
        let key = self.keys.all_permissions();

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Permission>>(&raw) {
                Ok(listing) => {
                    self.metrics.record_hit();
                    return Ok(listing);
                }
                Err(e) => warn!("Discarding undecodable cached permission listing: {}", e),
            },
            Ok(None) => {}
            Err(e) => {
                self.metrics.record_error();
                warn!(
                    "Cache read failed for permission listing, falling back to store: {}",
                    e
                );
            }
        }

        self.metrics.record_miss();
        let listing = self.store.list().await?;
        self.store_listing(&key, &listing).await;
        Ok(listing)
    }

    /// Get a permission by id
    pub async fn get_by_id(&self, id: &str) -> Result<Permission> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Permission {} not found", id)))
    }

    /// Get the permissions matching the given ids. Ids that do not resolve
    /// are omitted; callers that need strict validation diff the result.
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Permission>> {
        self.store.find_by_ids(ids).await
    }

    /// Get all permissions for a resource
    pub async fn get_by_resource(&self, resource: &str) -> Result<Vec<Permission>> {
        self.store.find_by_resource(resource).await
    }

    /// Register a new permission
    pub async fn create(&self, permission: Permission) -> Result<Permission> {
        if !self.store.insert_if_absent(&permission).await? {
            return Err(AuthzError::Conflict(format!(
                "Permission {} already exists",
                permission.id
            )));
        }

        self.invalidate_listing().await;
        debug!("Created permission {}", permission.id);
        Ok(permission)
    }

    /// Replace an existing permission definition
    pub async fn update(&self, permission: Permission) -> Result<Permission> {
        if !self.store.update(&permission).await? {
            return Err(AuthzError::NotFound(format!(
                "Permission {} not found",
                permission.id
            )));
        }

        self.invalidate_listing().await;
        debug!("Updated permission {}", permission.id);
        Ok(permission)
    }

    /// Remove a permission. Roles or principals still referencing the id
    /// simply stop resolving it; there is no cascading integrity check.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(AuthzError::NotFound(format!("Permission {} not found", id)));
        }

        self.invalidate_listing().await;
        debug!("Deleted permission {}", id);
        Ok(())
    }

    async fn store_listing(&self, key: &str, listing: &[Permission]) {
        let raw = match serde_json::to_string(listing) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize permission listing: {}", e);
                return;
            }
        };

        match self.cache.set(key, &raw, Some(self.listing_ttl_secs)).await {
            Ok(()) => self.metrics.record_write(),
            Err(e) => {
                self.metrics.record_error();
                warn!("Cache write failed for permission listing: {}", e);
            }
        }
    }

    async fn invalidate_listing(&self) {
        match self.cache.del(&self.keys.all_permissions()).await {
            Ok(()) => self.metrics.record_invalidation(),
            Err(e) => {
                self.metrics.record_error();
                warn!("Failed to invalidate permission listing cache: {}", e);
            }
        }
    }
}

fn system_permission(
    resource: &str,
    action: PermissionAction,
    name: &str,
    description: &str,
) -> Permission {
    Permission {
        id: format!("{}.{}", resource, action),
        resource: resource.to_string(),
        action,
        name: name.to_string(),
        description: description.to_string(),
        system: true,
    }
}

/// The well-known permission set seeded at bootstrap
pub(crate) fn default_permissions() -> Vec<Permission> {
    use PermissionAction::*;

    vec![
        // User management
        system_permission("users", Create, "Create users", "Create user accounts"),
        system_permission("users", Read, "Read users", "Read user information"),
        system_permission("users", Update, "Update users", "Update user accounts"),
        system_permission("users", Delete, "Delete users", "Delete user accounts"),
        system_permission(
            "users",
            Manage,
            "Manage users",
            "Full control over user accounts, roles, and grants",
        ),
        // Subscriptions
        system_permission(
            "subscriptions",
            Create,
            "Create subscriptions",
            "Create subscriptions for users",
        ),
        system_permission(
            "subscriptions",
            Read,
            "Read subscriptions",
            "Read subscription state",
        ),
        system_permission(
            "subscriptions",
            Update,
            "Update subscriptions",
            "Change subscription plans and status",
        ),
        system_permission(
            "subscriptions",
            Delete,
            "Delete subscriptions",
            "Cancel and remove subscriptions",
        ),
        // Promo codes
        system_permission(
            "promo_codes",
            Create,
            "Create promo codes",
            "Issue new promo codes",
        ),
        system_permission(
            "promo_codes",
            Read,
            "Read promo codes",
            "Read promo code definitions and usage",
        ),
        system_permission(
            "promo_codes",
            Update,
            "Update promo codes",
            "Change promo code terms",
        ),
        system_permission(
            "promo_codes",
            Delete,
            "Delete promo codes",
            "Retire promo codes",
        ),
        // Content
        system_permission("content", Create, "Create content", "Publish new content"),
        system_permission("content", Read, "Read content", "Read published content"),
        system_permission(
            "content",
            Update,
            "Update content",
            "Edit existing content",
        ),
        system_permission("content", Delete, "Delete content", "Remove content"),
        system_permission(
            "content",
            Manage,
            "Manage content",
            "Full control over the content library",
        ),
        // Auth
        system_permission("auth", Read, "Read sessions", "Inspect active sessions"),
        system_permission(
            "auth",
            Manage,
            "Manage auth",
            "Revoke sessions and manage credentials",
        ),
    ]
}
