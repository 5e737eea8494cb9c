//! Role catalog: named bundles of permissions

use super::permissions::PermissionCatalog;
use crate::authz::types::{Role, SystemRole};
use crate::cache::{CacheKeys, CacheMetrics};
use crate::storage::{KeyValueCache, RoleStore};
use crate::utils::error::{AuthzError, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Catalog of roles, one optionally bound to each fixed system tier
#[derive(Clone)]
pub struct RoleCatalog {
    store: Arc<dyn RoleStore>,
    permissions: PermissionCatalog,
    cache: Arc<dyn KeyValueCache>,
    metrics: Arc<CacheMetrics>,
    keys: CacheKeys,
    listing_ttl_secs: u64,
}

impl RoleCatalog {
    /// Create a catalog over the given store and cache
    pub fn new(
        store: Arc<dyn RoleStore>,
        permissions: PermissionCatalog,
        cache: Arc<dyn KeyValueCache>,
        metrics: Arc<CacheMetrics>,
        keys: CacheKeys,
        listing_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            permissions,
            cache,
            metrics,
            keys,
            listing_ttl_secs,
        }
    }

    /// Seed the system roles, seeding the permission catalog first. No-op
    /// when any roles already exist.
    pub async fn bootstrap(&self) -> Result<()> {
        self.permissions.bootstrap().await?;

        if self.store.count().await? > 0 {
            debug!("Role catalog already seeded, skipping bootstrap");
            return Ok(());
        }

        let all_permission_ids: Vec<String> = self
            .permissions
            .get_all()
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let mut created = 0usize;
        for (tier, name, description, permission_ids) in
            system_role_definitions(&all_permission_ids)
        {
            let resolved: HashSet<String> = self
                .permissions
                .get_by_ids(&permission_ids)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect();

            let role = Role::system(name, description, tier, resolved);
            if self.store.insert_if_absent(&role).await? {
                created += 1;
            }
        }

        info!("Seeded role catalog with {} system roles", created);
        Ok(())
    }

    /// List all roles, read-through cached
    pub async fn get_all(&self) -> Result<Vec<Role>> {
        let key = self.keys.all_roles();

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Role>>(&raw) {
                Ok(listing) => {
                    self.metrics.record_hit();
                    return Ok(listing);
                }
                Err(e) => warn!("Discarding undecodable cached role listing: {}", e),
            },
            Ok(None) => {}
            Err(e) => {
                self.metrics.record_error();
                warn!(
                    "Cache read failed for role listing, falling back to store: {}",
                    e
                );
            }
        }

        self.metrics.record_miss();
        let listing = self.store.list().await?;
        self.store_listing(&key, &listing).await;
        Ok(listing)
    }

    /// Get a role by id
    pub async fn get_by_id(&self, id: &str) -> Result<Role> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Role {} not found", id)))
    }

    /// Find a role by id without treating absence as an error
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        self.store.find_by_id(id).await
    }

    /// Get the role bound to a fixed system tier
    pub async fn get_by_system_role(&self, tier: SystemRole) -> Result<Role> {
        self.store
            .find_by_system_role(tier)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("No role for system tier {}", tier)))
    }

    /// Create a custom role. Permission ids are validated against the
    /// catalog; unknown ids fail the call with the offending ids.
    pub async fn create(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        permission_ids: &[String],
    ) -> Result<Role> {
        let name = name.into();
        let validated = self.validate_permission_ids(permission_ids).await?;

        if self.store.find_by_name(&name).await?.is_some() {
            return Err(AuthzError::Conflict(format!(
                "Role named {} already exists",
                name
            )));
        }

        let role = Role::new(name, description, validated);
        if !self.store.insert_if_absent(&role).await? {
            return Err(AuthzError::Conflict(format!(
                "Role {} already exists",
                role.id
            )));
        }

        self.invalidate_listing().await;
        debug!("Created role {} ({})", role.name, role.id);
        Ok(role)
    }

    /// Replace a role's name and description
    pub async fn update(&self, role: &Role) -> Result<()> {
        let mut updated = role.clone();
        updated.updated_at = Utc::now();

        if !self.store.update(&updated).await? {
            return Err(AuthzError::NotFound(format!("Role {} not found", role.id)));
        }

        self.invalidate_listing().await;
        debug!("Updated role {}", role.id);
        Ok(())
    }

    /// Replace a role's permission set wholesale (not additive).
    ///
    /// Role membership is not tracked in reverse, so every principal's
    /// cached effective set is flushed by pattern. Role edits are rare
    /// administrative events; the flush keeps correctness without a
    /// reverse index.
    pub async fn update_permissions(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> Result<Role> {
        let mut role = self.get_by_id(role_id).await?;
        let validated = self.validate_permission_ids(permission_ids).await?;

        role.permissions = validated;
        role.updated_at = Utc::now();

        if !self.store.update(&role).await? {
            return Err(AuthzError::NotFound(format!("Role {} not found", role_id)));
        }

        self.invalidate_listing().await;
        self.flush_principal_caches().await;
        info!(
            "Replaced permission set of role {} ({} permissions)",
            role_id,
            role.permissions.len()
        );
        Ok(role)
    }

    /// Remove a role. Principals still referencing the id stop receiving
    /// its permissions once their cached sets expire.
    pub async fn delete(&self, role_id: &str) -> Result<()> {
        if !self.store.delete(role_id).await? {
            return Err(AuthzError::NotFound(format!("Role {} not found", role_id)));
        }

        self.invalidate_listing().await;
        debug!("Deleted role {}", role_id);
        Ok(())
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

    async fn store_listing(&self, key: &str, listing: &[Role]) {
        let raw = match serde_json::to_string(listing) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize role listing: {}", e);
                return;
            }
        };

        match self.cache.set(key, &raw, Some(self.listing_ttl_secs)).await {
            Ok(()) => self.metrics.record_write(),
            Err(e) => {
                self.metrics.record_error();
                warn!("Cache write failed for role listing: {}", e);
            }
        }
    }

    async fn invalidate_listing(&self) {
        match self.cache.del(&self.keys.all_roles()).await {
            Ok(()) => self.metrics.record_invalidation(),
            Err(e) => {
                self.metrics.record_error();
                warn!("Failed to invalidate role listing cache: {}", e);
            }
        }
    }

    async fn flush_principal_caches(&self) {
        match self
            .cache
            .del_by_pattern(&self.keys.effective_pattern())
            .await
        {
            Ok(count) => {
                self.metrics.record_bulk_invalidation();
                debug!("Flushed {} cached principal permission sets", count);
            }
            Err(e) => {
                self.metrics.record_error();
                warn!("Failed to flush cached principal permission sets: {}", e);
            }
        }
    }
}

type RoleDefinition = (SystemRole, &'static str, &'static str, Vec<String>);

/// Fixed system roles and their permission grants
fn system_role_definitions(all_permission_ids: &[String]) -> Vec<RoleDefinition> {
    let manager_ids = [
        "users.read",
        "users.update",
        "subscriptions.create",
        "subscriptions.read",
        "subscriptions.update",
        "subscriptions.delete",
        "promo_codes.create",
        "promo_codes.read",
        "promo_codes.update",
        "promo_codes.delete",
        "content.create",
        "content.read",
        "content.update",
        "content.delete",
        "auth.read",
    ];
    let user_ids = ["users.read", "subscriptions.read", "content.read"];

    vec![
        (
            SystemRole::Admin,
            "Administrator",
            "Full access to every resource",
            all_permission_ids.to_vec(),
        ),
        (
            SystemRole::Manager,
            "Manager",
            "Day-to-day management of users, subscriptions, and content",
            manager_ids.iter().map(|s| s.to_string()).collect(),
        ),
        (
            SystemRole::User,
            "User",
            "Read access to own-facing resources",
            user_ids.iter().map(|s| s.to_string()).collect(),
        ),
    ]
}
