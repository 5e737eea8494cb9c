//! Effective permission resolution
//!
//! Pure computation over principal, role, and permission state: no caching
//! here. A principal's effective set is the union, deduplicated by
//! permission id, of direct grants, role-derived grants, and the resolved
//! legacy list.


use crate::authz::catalog::{PermissionCatalog, RoleCatalog};
use crate::authz::types::{EffectivePermissions, Permission, PermissionGrants, Principal};
use crate::storage::PrincipalStore;
use crate::utils::error::{AuthzError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Computes effective permission sets
#[derive(Clone)]
pub struct PermissionResolver {
    principals: Arc<dyn PrincipalStore>,
    permissions: PermissionCatalog,
    roles: RoleCatalog,
}

impl PermissionResolver {
    /// Create a resolver
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        permissions: PermissionCatalog,
        roles: RoleCatalog,
    ) -> Self {
        Self {
            principals,
            permissions,
            roles,
        }
    }

    /// Resolve a principal's effective permission set
    pub async fn resolve(&self, principal_id: &str) -> Result<EffectivePermissions> {
        let principal = self.load_principal(principal_id).await?;
        self.resolve_principal(&principal).await
    }

    /// Resolve from an already-loaded principal
    pub async fn resolve_principal(
        &self,
        principal: &Principal,
    ) -> Result<EffectivePermissions> {
        // The top admin tier holds every permission unconditionally; the
        // remaining sources are not consulted.
        if principal.is_admin() {
            return self.permissions.get_all().await;
        }

        let mut effective: HashMap<String, Permission> = HashMap::new();

        let grant_ids: Vec<String> = match &principal.grants {
            PermissionGrants::Direct { permission_ids } => {
                permission_ids.iter().cloned().collect()
            }
            PermissionGrants::Legacy { permission_ids } => permission_ids.clone(),
        };

        // Ids that no longer resolve are stale removals, dropped rather
        // than errored.
        let resolved = self.permissions.get_by_ids(&grant_ids).await?;
        if resolved.len() != grant_ids.len() {
            debug!(
                "Dropped {} unresolvable permission ids for principal {}",
                grant_ids.len() - resolved.len(),
                principal.id
            );
        }
        for permission in resolved {
            effective.insert(permission.id.clone(), permission);
        }

        for role_id in &principal.roles {
            match self.roles.find_by_id(role_id).await? {
                Some(role) => {
                    let role_permission_ids: Vec<String> =
                        role.permissions.iter().cloned().collect();
                    for permission in self.permissions.get_by_ids(&role_permission_ids).await? {
                        effective.entry(permission.id.clone()).or_insert(permission);
                    }
                }
                None => debug!(
                    "Principal {} references missing role {}",
                    principal.id, role_id
                ),
            }
        }

        Ok(effective.into_values().collect())
    }

    /// Check a single permission, admin bypass applied first
    pub async fn has_permission(&self, principal_id: &str, permission_id: &str) -> Result<bool> {
        let principal = self.load_principal(principal_id).await?;
        if principal.is_admin() {
            return Ok(true);
        }

        let effective = self.resolve_principal(&principal).await?;
        Ok(effective.iter().any(|p| p.id == permission_id))
    }

    /// Check whether the principal holds any of the given permissions
    pub async fn has_any(&self, principal_id: &str, permission_ids: &[String]) -> Result<bool> {
        let principal = self.load_principal(principal_id).await?;
        if principal.is_admin() {
            return Ok(true);
        }

        let effective = self.resolve_principal(&principal).await?;
        Ok(permission_ids
            .iter()
            .any(|id| effective.iter().any(|p| &p.id == id)))
    }

    /// Check whether the principal holds all of the given permissions
    pub async fn has_all(&self, principal_id: &str, permission_ids: &[String]) -> Result<bool> {
        let principal = self.load_principal(principal_id).await?;
        if principal.is_admin() {
            return Ok(true);
        }

        let effective = self.resolve_principal(&principal).await?;
        Ok(permission_ids
            .iter()
            .all(|id| effective.iter().any(|p| &p.id == id)))
    }

    async fn load_principal(&self, principal_id: &str) -> Result<Principal> {
        self.principals
            .find_by_id(principal_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Principal {} not found", principal_id)))
    }
}
