//! Request-time authorization checks
//!
//! The guard turns permission checks into a plain allow/deny boolean for
//! API-layer callers. Denials are normal outcomes, not errors, and every
//! internal failure denies: permission checks fail closed.


use crate::cache::CachedResolver;
use crate::utils::error::AuthzError;
use std::sync::Arc;
use tracing::{debug, warn};

/// How multiple required permissions combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequireMode {
    /// At least one of the required permissions suffices
    Any,
    /// Every required permission must be held
    All,
}

/// Allow/deny gate over the cached resolver
pub struct AuthorizationGuard {
    resolver: Arc<CachedResolver>,
}

impl AuthorizationGuard {
    /// Create a guard
    pub fn new(resolver: Arc<CachedResolver>) -> Self {
        Self { resolver }
    }

    /// Check a set of required permissions. An empty requirement always
    /// passes; an unknown principal denies rather than erroring.
    pub async fn authorize(
        &self,
        principal_id: &str,
        required: &[String],
        mode: RequireMode,
    ) -> bool {
        if required.is_empty() {
            return true;
        }

        let outcome = match mode {
            RequireMode::Any => self.resolver.has_any(principal_id, required).await,
            RequireMode::All => self.resolver.has_all(principal_id, required).await,
        };

        match outcome {
            Ok(allowed) => allowed,
            Err(AuthzError::NotFound(_)) => {
                debug!("Denying unknown principal {}", principal_id);
                false
            }
            Err(e) => {
                warn!(
                    "Authorization check failed for principal {}, denying: {}",
                    principal_id, e
                );
                false
            }
        }
    }

    /// Check a single required permission
    pub async fn authorize_one(&self, principal_id: &str, permission_id: &str) -> bool {
        let required = [permission_id.to_string()];
        self.authorize(principal_id, &required, RequireMode::All).await
    }
}
