//! Tests for the cache-aside layer

use super::{CacheKeys, CacheMetrics, CachedResolver};
use crate::authz::catalog::{PermissionCatalog, RoleCatalog};
use crate::authz::resolver::PermissionResolver;
use crate::authz::types::{Permission, PermissionAction, PermissionGrants, Principal};
use crate::storage::{KeyValueCache, MemoryKv, MemoryStore, PrincipalStore};
use crate::utils::error::{AuthzError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    store: Arc<MemoryStore>,
    kv: Arc<MemoryKv>,
    keys: CacheKeys,
    metrics: Arc<CacheMetrics>,
    permissions: PermissionCatalog,
    resolver: Arc<CachedResolver>,
}

fn fixture_with(cache: Arc<dyn KeyValueCache>, principal_ttl_secs: u64) -> Fixture {
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
        Arc::clone(&store) as Arc<dyn crate::storage::RoleStore>,
        permissions.clone(),
        Arc::clone(&kv) as Arc<dyn KeyValueCache>,
        Arc::clone(&metrics),
        keys.clone(),
        3600,
    );
    let inner = PermissionResolver::new(
        Arc::clone(&store) as Arc<dyn PrincipalStore>,
        permissions.clone(),
        roles,
    );
    let resolver = Arc::new(CachedResolver::new(
        inner,
        Arc::clone(&store) as Arc<dyn PrincipalStore>,
        cache,
        Arc::clone(&metrics),
        keys.clone(),
        principal_ttl_secs,
    ));

    Fixture {
        store,
        kv,
        keys,
        metrics,
        permissions,
        resolver,
    }
}

fn fixture() -> Fixture {
    let kv = Arc::new(MemoryKv::new());
    let mut f = fixture_with(Arc::clone(&kv) as Arc<dyn KeyValueCache>, 300);
    f.kv = kv;
    f
}

async fn seed_principal(f: &Fixture, id: &str, permission_ids: &[&str]) {
    for pid in permission_ids {
        let (resource, _) = pid.split_once('.').unwrap();
        f.permissions
            .create(Permission::new(
                *pid,
                resource,
                PermissionAction::Read,
                *pid,
                "test permission",
            ))
            .await
            .unwrap();
    }

    let mut principal = Principal::new(id);
    principal.grants = PermissionGrants::Direct {
        permission_ids: permission_ids.iter().map(|s| s.to_string()).collect(),
    };
    f.store.insert(&principal).await.unwrap();
}

fn id_set(effective: &[Permission]) -> HashSet<String> {
    effective.iter().map(|p| p.id.clone()).collect()
}

#[tokio::test]
async fn test_miss_then_hit() {
    let f = fixture();
    seed_principal(&f, "u-1", &["a.read"]).await;

    let first = f.resolver.resolve("u-1").await.unwrap();
    let second = f.resolver.resolve("u-1").await.unwrap();
    assert_eq!(id_set(&first), id_set(&second));

    let stats = f.metrics.snapshot();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test]
async fn test_hit_serves_stale_value_until_invalidated() {
    let f = fixture();
    seed_principal(&f, "u-1", &["a.read"]).await;
    f.permissions
        .create(Permission::new(
            "b.read",
            "b",
            PermissionAction::Read,
            "b.read",
            "test permission",
        ))
        .await
        .unwrap();

    f.resolver.resolve("u-1").await.unwrap();

    // mutate the stored principal without invalidating
    let mut principal = f.store.find_by_id("u-1").await.unwrap().unwrap();
    principal.grants = PermissionGrants::Direct {
        permission_ids: ["b.read".to_string()].into_iter().collect(),
    };
    f.store.update(&principal).await.unwrap();

    // cached value still wins
    let stale = f.resolver.resolve("u-1").await.unwrap();
    assert_eq!(id_set(&stale), ["a.read".to_string()].into_iter().collect());

    // invalidation makes the next read recompute
    f.resolver.invalidate_principal("u-1").await;
    let fresh = f.resolver.resolve("u-1").await.unwrap();
    assert_eq!(id_set(&fresh), ["b.read".to_string()].into_iter().collect());
}

#[tokio::test]
async fn test_ttl_bounds_staleness() {
    let kv = Arc::new(MemoryKv::new());
    let f = {
        let mut f = fixture_with(Arc::clone(&kv) as Arc<dyn KeyValueCache>, 1);
        f.kv = kv;
        f
    };
    seed_principal(&f, "u-1", &["a.read"]).await;
    f.permissions
        .create(Permission::new(
            "b.read",
            "b",
            PermissionAction::Read,
            "b.read",
            "test permission",
        ))
        .await
        .unwrap();

    f.resolver.resolve("u-1").await.unwrap();

    let mut principal = f.store.find_by_id("u-1").await.unwrap().unwrap();
    principal.grants = PermissionGrants::Direct {
        permission_ids: ["b.read".to_string()].into_iter().collect(),
    };
    f.store.update(&principal).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    // the entry expired, so the mutation is visible without invalidation
    let fresh = f.resolver.resolve("u-1").await.unwrap();
    assert_eq!(id_set(&fresh), ["b.read".to_string()].into_iter().collect());
}

#[tokio::test]
async fn test_invalidate_all_principals() {
    let f = fixture();
    seed_principal(&f, "u-1", &["a.read"]).await;
    seed_principal(&f, "u-2", &["b.read"]).await;

    f.resolver.resolve("u-1").await.unwrap();
    f.resolver.resolve("u-2").await.unwrap();
    assert!(f.kv.get(&f.keys.effective("u-1")).await.unwrap().is_some());
    assert!(f.kv.get(&f.keys.effective("u-2")).await.unwrap().is_some());

    f.resolver.invalidate_all_principals().await;

    assert!(f.kv.get(&f.keys.effective("u-1")).await.unwrap().is_none());
    assert!(f.kv.get(&f.keys.effective("u-2")).await.unwrap().is_none());
    assert_eq!(f.metrics.snapshot().bulk_invalidations, 1);
}

#[tokio::test]
async fn test_undecodable_cache_entry_is_recomputed() {
    let f = fixture();
    seed_principal(&f, "u-1", &["a.read"]).await;

    f.kv.set(&f.keys.effective("u-1"), "not json", None)
        .await
        .unwrap();

    let effective = f.resolver.resolve("u-1").await.unwrap();
    assert_eq!(
        id_set(&effective),
        ["a.read".to_string()].into_iter().collect()
    );
}

/// Cache backend that always fails
struct DownKv;

#[async_trait]
impl KeyValueCache for DownKv {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(AuthzError::Cache("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: Option<u64>) -> Result<()> {
        Err(AuthzError::Cache("connection refused".to_string()))
    }

    async fn del(&self, _key: &str) -> Result<()> {
        Err(AuthzError::Cache("connection refused".to_string()))
    }

    async fn del_by_pattern(&self, _pattern: &str) -> Result<u64> {
        Err(AuthzError::Cache("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_cache_outage_degrades_to_resolver() {
    let f = fixture_with(Arc::new(DownKv), 300);
    seed_principal(&f, "u-1", &["a.read"]).await;

    // reads never propagate the cache failure
    let effective = f.resolver.resolve("u-1").await.unwrap();
    assert_eq!(
        id_set(&effective),
        ["a.read".to_string()].into_iter().collect()
    );

    // invalidation failures are swallowed too
    f.resolver.invalidate_principal("u-1").await;
    f.resolver.invalidate_all_principals().await;

    let stats = f.metrics.snapshot();
    assert!(stats.errors >= 2);
}
