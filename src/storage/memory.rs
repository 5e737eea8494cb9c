//! In-memory store backend
//!
//! DashMap-backed implementation of the record stores, used by tests and
//! embedded deployments.

use super::store::{PermissionStore, PrincipalStore, RoleStore};
use crate::authz::types::{Permission, PermissionGrants, Principal, Role, SystemRole};
use crate::utils::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// In-memory store for permission, role, and principal records
#[derive(Debug, Default)]
pub struct MemoryStore {
    permissions: DashMap<String, Permission>,
    roles: DashMap<String, Role>,
    principals: DashMap<String, Principal>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Permission>> {
        Ok(self.permissions.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Permission>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = self.permissions.get(id) {
                found.push(entry.value().clone());
            }
        }
        Ok(found)
    }

    async fn find_by_resource(&self, resource: &str) -> Result<Vec<Permission>> {
        Ok(self
            .permissions
            .iter()
            .filter(|entry| entry.value().resource == resource)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list(&self) -> Result<Vec<Permission>> {
        Ok(self
            .permissions
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.permissions.len() as u64)
    }

    async fn insert_if_absent(&self, permission: &Permission) -> Result<bool> {
        match self.permissions.entry(permission.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(permission.clone());
                Ok(true)
            }
        }
    }

    async fn update(&self, permission: &Permission) -> Result<bool> {
        match self.permissions.get_mut(&permission.id) {
            Some(mut entry) => {
                *entry = permission.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.permissions.remove(id).is_some())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        Ok(self.roles.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self
            .roles
            .iter()
            .find(|entry| entry.value().name == name)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_system_role(&self, tier: SystemRole) -> Result<Option<Role>> {
        Ok(self
            .roles
            .iter()
            .find(|entry| entry.value().system_role == Some(tier))
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Role>> {
        Ok(self.roles.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.roles.len() as u64)
    }

    async fn insert_if_absent(&self, role: &Role) -> Result<bool> {
        match self.roles.entry(role.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(role.clone());
                Ok(true)
            }
        }
    }

    async fn update(&self, role: &Role) -> Result<bool> {
        match self.roles.get_mut(&role.id) {
            Some(mut entry) => {
                *entry = role.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.roles.remove(id).is_some())
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>> {
        Ok(self.principals.get(id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, principal: &Principal) -> Result<bool> {
        match self.principals.entry(principal.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(principal.clone());
                Ok(true)
            }
        }
    }

    async fn update(&self, principal: &Principal) -> Result<bool> {
        match self.principals.get_mut(&principal.id) {
            Some(mut entry) => {
                *entry = principal.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_unmigrated(&self) -> Result<Vec<Principal>> {
        Ok(self
            .principals
            .iter()
            .filter(|entry| matches!(entry.value().grants, PermissionGrants::Legacy { .. }))
            .map(|entry| entry.value().clone())
            .collect())
    }
}
