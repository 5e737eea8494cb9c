//! Store traits for permission, role, and principal records
//!
//! The backing store is an external collaborator: a document or relational
//! database reached through these seams. Implementations must be cheap to
//! clone behind an `Arc` and safe to share across tasks.

use crate::authz::types::{Permission, Principal, Role, SystemRole};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Document-store view over permission records
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Find a permission by id
    async fn find_by_id(&self, id: &str) -> Result<Option<Permission>>;

    /// Find the permissions matching the given ids; missing ids are omitted
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Permission>>;

    /// Find all permissions for a resource
    async fn find_by_resource(&self, resource: &str) -> Result<Vec<Permission>>;

    /// List all permissions
    async fn list(&self) -> Result<Vec<Permission>>;

    /// Count stored permissions
    async fn count(&self) -> Result<u64>;

    /// Insert unless the id is already taken. Returns whether it inserted.
    /// Must be atomic at the store level: two concurrent callers with the
    /// same id must not both observe `true`.
    async fn insert_if_absent(&self, permission: &Permission) -> Result<bool>;

    /// Replace a stored permission. Returns whether a record existed.
    async fn update(&self, permission: &Permission) -> Result<bool>;

    /// Delete a permission by id. Returns whether a record existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Document-store view over role records
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Find a role by id
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>>;

    /// Find a role by its unique name
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Find the role bound to a fixed system tier
    async fn find_by_system_role(&self, tier: SystemRole) -> Result<Option<Role>>;

    /// List all roles
    async fn list(&self) -> Result<Vec<Role>>;

    /// Count stored roles
    async fn count(&self) -> Result<u64>;

    /// Insert unless the id is already taken. Returns whether it inserted.
    async fn insert_if_absent(&self, role: &Role) -> Result<bool>;

    /// Replace a stored role. Returns whether a record existed.
    async fn update(&self, role: &Role) -> Result<bool>;

    /// Delete a role by id. Returns whether a record existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Document-store view over principal records
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find a principal by id
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>>;

    /// Insert unless the id is already taken. Returns whether it inserted.
    async fn insert(&self, principal: &Principal) -> Result<bool>;

    /// Replace a stored principal. Returns whether a record existed.
    async fn update(&self, principal: &Principal) -> Result<bool>;

    /// List every principal whose legacy permission list has not been
    /// migrated yet
    async fn list_unmigrated(&self) -> Result<Vec<Principal>>;
}
