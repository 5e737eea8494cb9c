//! One-shot conversion of legacy flat permission lists
//!
//! Principals created before the role/reference model carry a flat list of
//! raw permission ids. Migration resolves that list against the catalog and
//! replaces it with normalized direct references; the transition is one-way.


use crate::authz::catalog::PermissionCatalog;
use crate::authz::types::{PermissionGrants, Principal};
use crate::cache::CachedResolver;
use crate::storage::PrincipalStore;
use crate::utils::error::{AuthzError, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome counters for a batch migration run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Principals converted to normalized references
    pub migrated: u64,
    /// Principals that turned out to be already migrated
    pub skipped: u64,
    /// Principals whose migration failed; counted, never aborting the batch
    pub failed: u64,
}

/// Converts legacy permission lists into direct references
pub struct LegacyMigration {
    principals: Arc<dyn PrincipalStore>,
    permissions: PermissionCatalog,
    resolver: Arc<CachedResolver>,
}

impl LegacyMigration {
    /// Create a migration runner
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        permissions: PermissionCatalog,
        resolver: Arc<CachedResolver>,
    ) -> Self {
        Self {
            principals,
            permissions,
            resolver,
        }
    }

    /// Migrate one principal. A principal whose grants are already
    /// normalized is returned unchanged; calling twice is a no-op.
    pub async fn migrate(&self, principal_id: &str) -> Result<Principal> {
        let mut principal = self
            .principals
            .find_by_id(principal_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Principal {} not found", principal_id)))?;

        let legacy_ids = match &principal.grants {
            PermissionGrants::Direct { .. } => {
                debug!("Principal {} already migrated", principal_id);
                return Ok(principal);
            }
            PermissionGrants::Legacy { permission_ids } => permission_ids.clone(),
        };

        let resolved_ids: HashSet<String> = self
            .permissions
            .get_by_ids(&legacy_ids)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let dropped: Vec<&String> = legacy_ids
            .iter()
            .filter(|id| !resolved_ids.contains(id.as_str()))
            .collect();
        if !dropped.is_empty() {
            warn!(
                "Dropping {} stale legacy permission ids for principal {}: {:?}",
                dropped.len(),
                principal_id,
                dropped
            );
        }

        principal.grants = PermissionGrants::Direct {
            permission_ids: resolved_ids,
        };
        principal.updated_at = Utc::now();

        // Store first; a failed invalidation only extends staleness to the
        // TTL window and is logged inside the resolver.
        if !self.principals.update(&principal).await? {
            return Err(AuthzError::NotFound(format!(
                "Principal {} not found",
                principal_id
            )));
        }
        self.resolver.invalidate_principal(principal_id).await;

        info!("Migrated legacy permissions for principal {}", principal_id);
        Ok(principal)
    }

    /// Migrate every principal with a pending legacy list. One principal's
    /// failure is counted and logged; the batch continues.
    pub async fn migrate_all(&self) -> Result<MigrationReport> {
        let pending = self.principals.list_unmigrated().await?;
        info!(
            "Migrating legacy permissions for {} principals",
            pending.len()
        );

        let mut report = MigrationReport::default();
        for principal in pending {
            if principal.grants.is_migrated() {
                report.skipped += 1;
                continue;
            }

            match self.migrate(&principal.id).await {
                Ok(_) => report.migrated += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        "Legacy migration failed for principal {}: {}",
                        principal.id, e
                    );
                }
            }
        }

        info!(
            "Legacy migration finished: {} migrated, {} skipped, {} failed",
            report.migrated, report.skipped, report.failed
        );
        Ok(report)
    }
}
