//! Core access-control types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// An atomic, named capability: an action on a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable identifier, e.g. `users.update`
    pub id: String,
    /// Resource this permission applies to
    pub resource: String,
    /// Action this permission allows
    pub action: PermissionAction,
    /// Human-readable name
    pub name: String,
    /// Permission description
    pub description: String,
    /// Whether this is a well-known system permission
    pub system: bool,
}

impl Permission {
    /// Create a custom permission
    pub fn new(
        id: impl Into<String>,
        resource: impl Into<String>,
        action: PermissionAction,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource: resource.into(),
            action,
            name: name.into(),
            description: description.into(),
            system: false,
        }
    }
}

/// Action component of a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    /// Create new records
    Create,
    /// Read records
    Read,
    /// Update existing records
    Update,
    /// Delete records
    Delete,
    /// Full administrative control over the resource
    Manage,
}

impl std::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionAction::Create => write!(f, "create"),
            PermissionAction::Read => write!(f, "read"),
            PermissionAction::Update => write!(f, "update"),
            PermissionAction::Delete => write!(f, "delete"),
            PermissionAction::Manage => write!(f, "manage"),
        }
    }
}

impl std::str::FromStr for PermissionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(PermissionAction::Create),
            "read" => Ok(PermissionAction::Read),
            "update" => Ok(PermissionAction::Update),
            "delete" => Ok(PermissionAction::Delete),
            "manage" => Ok(PermissionAction::Manage),
            _ => Err(format!("Invalid permission action: {}", s)),
        }
    }
}

/// A named, reusable bundle of permissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Role id
    pub id: String,
    /// Role name (unique)
    pub name: String,
    /// Role description
    pub description: String,
    /// Fixed system tier this role maps to, if any (unique per tier)
    pub system_role: Option<SystemRole>,
    /// Permission ids granted by this role
    pub permissions: HashSet<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Create a custom role
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        permissions: HashSet<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            system_role: None,
            permissions,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a role bound to a fixed system tier
    pub(crate) fn system(
        name: impl Into<String>,
        description: impl Into<String>,
        tier: SystemRole,
        permissions: HashSet<String>,
    ) -> Self {
        let mut role = Self::new(name, description, permissions);
        role.system_role = Some(tier);
        role
    }
}

/// Fixed system tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Administrator; holds every permission unconditionally
    Admin,
    /// Manager tier
    Manager,
    /// Regular user tier
    User,
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemRole::Admin => write!(f, "admin"),
            SystemRole::Manager => write!(f, "manager"),
            SystemRole::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for SystemRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(SystemRole::Admin),
            "manager" => Ok(SystemRole::Manager),
            "user" => Ok(SystemRole::User),
            _ => Err(format!("Invalid system role: {}", s)),
        }
    }
}

/// Permission grants held directly by a principal.
///
/// The `Legacy` variant carries a flat permission-id list predating role
/// references. The transition to `Direct` is one-way: no operation moves a
/// principal back to `Legacy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PermissionGrants {
    /// Unmigrated flat permission-id list, pending one-time conversion
    Legacy {
        /// Raw permission ids, possibly stale
        permission_ids: Vec<String>,
    },
    /// Normalized direct permission references
    Direct {
        /// Permission ids validated against the catalog at assignment time
        permission_ids: HashSet<String>,
    },
}

impl PermissionGrants {
    /// Empty, migrated grant set
    pub fn empty() -> Self {
        PermissionGrants::Direct {
            permission_ids: HashSet::new(),
        }
    }

    /// Whether the legacy-to-direct transition has completed
    pub fn is_migrated(&self) -> bool {
        matches!(self, PermissionGrants::Direct { .. })
    }
}

/// The entity whose access is being evaluated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Principal id
    pub id: String,
    /// Role ids held by this principal
    pub roles: HashSet<String>,
    /// Direct permission grants
    pub grants: PermissionGrants,
    /// Scalar tier tag; `Admin` short-circuits resolution entirely
    pub system_role: Option<SystemRole>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Create a principal with no roles or grants
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            roles: HashSet::new(),
            grants: PermissionGrants::empty(),
            system_role: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the system tier tag
    pub fn with_system_role(mut self, tier: SystemRole) -> Self {
        self.system_role = Some(tier);
        self
    }

    /// Start from an unmigrated flat permission-id list
    pub fn with_legacy_permissions(mut self, permission_ids: Vec<String>) -> Self {
        self.grants = PermissionGrants::Legacy { permission_ids };
        self
    }

    /// Whether the principal holds the top admin tier
    pub fn is_admin(&self) -> bool {
        matches!(self.system_role, Some(SystemRole::Admin))
    }
}

/// Effective permission set: the deduplicated union of all permissions a
/// principal holds through any source, at a point in time. Derived, never
/// persisted durably.
pub type EffectivePermissions = Vec<Permission>;
