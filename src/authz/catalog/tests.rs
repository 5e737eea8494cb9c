//! Tests for the permission and role catalogs

use super::permissions::default_permissions;
use super::{PermissionCatalog, RoleCatalog};
use crate::authz::types::{Permission, PermissionAction, SystemRole};
use crate::cache::{CacheKeys, CacheMetrics};
use crate::storage::{KeyValueCache, MemoryKv, MemoryStore};
use crate::utils::error::AuthzError;
use std::sync::Arc;

struct Fixture {
    kv: Arc<MemoryKv>,
    keys: CacheKeys,
    permissions: PermissionCatalog,
    roles: RoleCatalog,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let kv = Arc::new(MemoryKv::new());
    let metrics = Arc::new(CacheMetrics::new());
    let keys = CacheKeys::default();

    let permissions = PermissionCatalog::new(
        Arc::clone(&store) as Arc<dyn crate::storage::PermissionStore>,
        Arc::clone(&kv) as Arc<dyn KeyValueCache>,
        Arc::clone(&metrics),
        keys.clone(),
        3600,
    );
    let roles = RoleCatalog::new(
        store,
        permissions.clone(),
        Arc::clone(&kv) as Arc<dyn KeyValueCache>,
        metrics,
        keys.clone(),
        3600,
    );

    Fixture {
        kv,
        keys,
        permissions,
        roles,
    }
}

fn custom_permission(id: &str, resource: &str) -> Permission {
    Permission::new(id, resource, PermissionAction::Read, id, "test permission")
}

#[tokio::test]
async fn test_permission_bootstrap_seeds_when_empty() {
    let f = fixture();

    f.permissions.bootstrap().await.unwrap();

    let all = f.permissions.get_all().await.unwrap();
    assert_eq!(all.len(), default_permissions().len());
    assert!(f.permissions.get_by_id("users.read").await.is_ok());
    assert!(f.permissions.get_by_id("subscriptions.update").await.is_ok());
    assert!(f.permissions.get_by_id("promo_codes.delete").await.is_ok());
}

#[tokio::test]
async fn test_permission_bootstrap_is_idempotent() {
    let f = fixture();

    f.permissions.bootstrap().await.unwrap();
    let first = f.permissions.get_all().await.unwrap().len();

    f.permissions.bootstrap().await.unwrap();
    let second = f.permissions.get_all().await.unwrap().len();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_permission_bootstrap_skips_nonempty_catalog() {
    let f = fixture();

    f.permissions
        .create(custom_permission("reports.read", "reports"))
        .await
        .unwrap();
    f.permissions.bootstrap().await.unwrap();

    // a non-empty catalog is left untouched
    let all = f.permissions.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "reports.read");
}

#[tokio::test]
async fn test_permission_create_conflict() {
    let f = fixture();

    f.permissions
        .create(custom_permission("reports.read", "reports"))
        .await
        .unwrap();
    let err = f
        .permissions
        .create(custom_permission("reports.read", "reports"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthzError::Conflict(_)));
}

#[tokio::test]
async fn test_permission_update_and_delete_missing() {
    let f = fixture();

    let err = f
        .permissions
        .update(custom_permission("ghost.read", "ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));

    let err = f.permissions.delete("ghost.read").await.unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
}

#[tokio::test]
async fn test_permission_get_by_resource() {
    let f = fixture();
    f.permissions.bootstrap().await.unwrap();

    let users = f.permissions.get_by_resource("users").await.unwrap();
    assert!(!users.is_empty());
    assert!(users.iter().all(|p| p.resource == "users"));
}

#[tokio::test]
async fn test_permission_mutation_invalidates_listing_cache() {
    let f = fixture();
    f.permissions.bootstrap().await.unwrap();

    // prime the listing cache, then mutate
    let before = f.permissions.get_all().await.unwrap().len();
    f.permissions
        .create(custom_permission("reports.read", "reports"))
        .await
        .unwrap();

    let after = f.permissions.get_all().await.unwrap().len();
    assert_eq!(after, before + 1);
}

#[tokio::test]
async fn test_role_bootstrap_creates_system_roles() {
    let f = fixture();

    f.roles.bootstrap().await.unwrap();

    let all = f.roles.get_all().await.unwrap();
    assert_eq!(all.len(), 3);

    let admin = f.roles.get_by_system_role(SystemRole::Admin).await.unwrap();
    let catalog_size = f.permissions.get_all().await.unwrap().len();
    assert_eq!(admin.permissions.len(), catalog_size);

    let user = f.roles.get_by_system_role(SystemRole::User).await.unwrap();
    assert!(user.permissions.contains("users.read"));
    assert!(!user.permissions.contains("users.delete"));
}

#[tokio::test]
async fn test_role_bootstrap_is_idempotent() {
    let f = fixture();

    f.roles.bootstrap().await.unwrap();
    f.roles.bootstrap().await.unwrap();

    assert_eq!(f.roles.get_all().await.unwrap().len(), 3);
    assert_eq!(
        f.permissions.get_all().await.unwrap().len(),
        default_permissions().len()
    );
}

#[tokio::test]
async fn test_role_create_validates_permission_ids() {
    let f = fixture();
    f.permissions.bootstrap().await.unwrap();

    let err = f
        .roles
        .create(
            "Broken",
            "role with unknown grants",
            &["users.read".to_string(), "nope.read".to_string()],
        )
        .await
        .unwrap_err();

    match err {
        AuthzError::Validation { ids, .. } => assert_eq!(ids, vec!["nope.read".to_string()]),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_role_create_rejects_duplicate_name() {
    let f = fixture();
    f.permissions.bootstrap().await.unwrap();

    f.roles
        .create("Support", "support staff", &["users.read".to_string()])
        .await
        .unwrap();
    let err = f
        .roles
        .create("Support", "another", &["users.read".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, AuthzError::Conflict(_)));
}

#[tokio::test]
async fn test_update_permissions_replaces_wholesale() {
    let f = fixture();
    f.permissions.bootstrap().await.unwrap();

    let role = f
        .roles
        .create("Support", "support staff", &["users.read".to_string()])
        .await
        .unwrap();

    let updated = f
        .roles
        .update_permissions(&role.id, &["content.read".to_string()])
        .await
        .unwrap();

    assert_eq!(updated.permissions.len(), 1);
    assert!(updated.permissions.contains("content.read"));
    assert!(!updated.permissions.contains("users.read"));
}

#[tokio::test]
async fn test_update_permissions_flushes_principal_caches() {
    let f = fixture();
    f.permissions.bootstrap().await.unwrap();

    let role = f
        .roles
        .create("Support", "support staff", &["users.read".to_string()])
        .await
        .unwrap();

    // simulate cached effective sets for two principals
    f.kv.set(&f.keys.effective("u-1"), "[]", None).await.unwrap();
    f.kv.set(&f.keys.effective("u-2"), "[]", None).await.unwrap();

    f.roles
        .update_permissions(&role.id, &["content.read".to_string()])
        .await
        .unwrap();

    assert_eq!(f.kv.get(&f.keys.effective("u-1")).await.unwrap(), None);
    assert_eq!(f.kv.get(&f.keys.effective("u-2")).await.unwrap(), None);
}

#[tokio::test]
async fn test_role_delete_missing_not_found() {
    let f = fixture();

    let err = f.roles.delete("no-such-role").await.unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
}
