//! End-to-end scenarios against the in-memory backends

use authzd::{
    AccessControl, Config, Permission, PermissionAction, Principal, RequireMode, SystemRole,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

fn engine() -> AccessControl {
    init_tracing();
    AccessControl::in_memory(&Config::default())
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_manager_with_direct_edit_grant() {
    let engine = engine();

    engine
        .permissions()
        .create(Permission::new(
            "users.edit",
            "users",
            PermissionAction::Update,
            "Edit users",
            "Edit user accounts",
        ))
        .await
        .unwrap();
    engine
        .permissions()
        .create(Permission::new(
            "users.view",
            "users",
            PermissionAction::Read,
            "View users",
            "View user accounts",
        ))
        .await
        .unwrap();

    let manager = engine
        .roles()
        .create("Manager", "views users", &ids(&["users.view"]))
        .await
        .unwrap();

    let principal = engine.create_principal(Principal::new("u-1")).await.unwrap();
    engine
        .assign_roles(&principal.id, &[manager.id.clone()])
        .await
        .unwrap();
    engine
        .assign_direct_permissions(&principal.id, &ids(&["users.edit"]))
        .await
        .unwrap();

    let mut effective: Vec<String> = engine
        .resolve_effective_permissions(&principal.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    effective.sort();
    assert_eq!(effective, vec!["users.edit".to_string(), "users.view".to_string()]);

    let required = ids(&["users.edit", "users.delete"]);
    assert!(
        engine
            .authorize(&principal.id, &required, RequireMode::Any)
            .await
    );
    assert!(
        !engine
            .authorize(&principal.id, &required, RequireMode::All)
            .await
    );
}

#[tokio::test]
async fn test_bootstrap_and_admin_bypass() {
    let engine = engine();
    engine.bootstrap().await.unwrap();

    // bootstrap twice: same catalogs
    let permissions = engine.permissions().get_all().await.unwrap();
    engine.bootstrap().await.unwrap();
    assert_eq!(
        engine.permissions().get_all().await.unwrap().len(),
        permissions.len()
    );
    assert_eq!(engine.roles().get_all().await.unwrap().len(), 3);

    // an admin-tier principal with no grants at all passes every check
    let admin = engine
        .create_principal(Principal::new("root").with_system_role(SystemRole::Admin))
        .await
        .unwrap();

    let every_id: Vec<String> = permissions.into_iter().map(|p| p.id).collect();
    assert!(engine.authorize(&admin.id, &every_id, RequireMode::All).await);
}

#[tokio::test]
async fn test_role_edit_propagates_to_every_member() {
    let engine = engine();
    engine.bootstrap().await.unwrap();

    let manager_role = engine
        .roles()
        .get_by_system_role(SystemRole::Manager)
        .await
        .unwrap();

    let a = engine.create_principal(Principal::new("m-1")).await.unwrap();
    let b = engine.create_principal(Principal::new("m-2")).await.unwrap();
    for principal in [&a, &b] {
        engine
            .assign_roles(&principal.id, &[manager_role.id.clone()])
            .await
            .unwrap();
        // warm the cache
        assert!(engine.authorize_one(&principal.id, "users.read").await);
    }

    // wholesale replacement of the role's permission set; no per-principal
    // invalidation is issued, the flush is pattern-wide
    engine
        .roles()
        .update_permissions(&manager_role.id, &ids(&["content.read"]))
        .await
        .unwrap();

    for principal in [&a, &b] {
        assert!(!engine.authorize_one(&principal.id, "users.read").await);
        assert!(engine.authorize_one(&principal.id, "content.read").await);
    }
}

#[tokio::test]
async fn test_assignment_is_visible_despite_prior_cached_value() {
    let engine = engine();
    engine.bootstrap().await.unwrap();

    let principal = engine.create_principal(Principal::new("u-1")).await.unwrap();

    // cache an empty effective set
    assert!(!engine.authorize_one(&principal.id, "content.read").await);

    engine
        .assign_direct_permissions(&principal.id, &ids(&["content.read"]))
        .await
        .unwrap();

    assert!(engine.authorize_one(&principal.id, "content.read").await);
}

#[tokio::test]
async fn test_legacy_migration_end_to_end() {
    let engine = engine();
    engine.bootstrap().await.unwrap();

    let principal = engine
        .create_principal(
            Principal::new("old-timer")
                .with_legacy_permissions(ids(&["users.read", "retired.permission"])),
        )
        .await
        .unwrap();

    // legacy grants already resolve before migration
    assert!(engine.authorize_one(&principal.id, "users.read").await);

    let migrated = engine
        .migrate_legacy_permissions(&principal.id)
        .await
        .unwrap();
    assert!(migrated.grants.is_migrated());

    // and keep resolving after; the stale id is gone for good
    assert!(engine.authorize_one(&principal.id, "users.read").await);
    assert!(
        !engine
            .authorize_one(&principal.id, "retired.permission")
            .await
    );

    // nothing left for the batch path
    let report = engine.migrate_all_legacy().await.unwrap();
    assert_eq!(report.migrated, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_validation_reports_offending_ids() {
    let engine = engine();
    engine.bootstrap().await.unwrap();

    let principal = engine.create_principal(Principal::new("u-1")).await.unwrap();
    let err = engine
        .assign_direct_permissions(&principal.id, &ids(&["users.read", "bogus.id"]))
        .await
        .unwrap_err();

    match err {
        authzd::AuthzError::Validation { ids, .. } => {
            assert_eq!(ids, vec!["bogus.id".to_string()]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cache_stats_are_exposed() {
    let engine = engine();
    engine.bootstrap().await.unwrap();

    let principal = engine.create_principal(Principal::new("u-1")).await.unwrap();
    engine
        .resolve_effective_permissions(&principal.id)
        .await
        .unwrap();
    engine
        .resolve_effective_permissions(&principal.id)
        .await
        .unwrap();

    let stats = engine.cache_stats();
    assert!(stats.hits >= 1);
    assert!(stats.misses >= 1);
    assert!(stats.hit_rate() > 0.0);
}
