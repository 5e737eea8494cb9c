//! Cache key construction
//!
//! Every cache key is built here so the namespace stays consistent between
//! writers and the pattern-based invalidation path.

/// Builds cache keys from a single configurable namespace prefix
#[derive(Debug, Clone)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    /// Create a key builder with the given namespace prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Per-principal effective permission set
    pub fn effective(&self, principal_id: &str) -> String {
        format!("{}:effective:{}", self.prefix, principal_id)
    }

    /// Pattern matching every per-principal effective set
    pub fn effective_pattern(&self) -> String {
        format!("{}:effective:*", self.prefix)
    }

    /// All-permissions catalog listing
    pub fn all_permissions(&self) -> String {
        format!("{}:catalog:permissions", self.prefix)
    }

    /// All-roles catalog listing
    pub fn all_roles(&self) -> String {
        format!("{}:catalog:roles", self.prefix)
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new("authz")
    }
}
