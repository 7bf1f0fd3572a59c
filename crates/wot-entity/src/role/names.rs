//! API names of roles and permissions.
//!
//! Roles and permissions are externally maintained reference rows; the core
//! only ever handles them by their stable API name (`"comments-user"`,
//! `"create-comments"`), so both are thin string newtypes rather than enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// API name of a role, e.g. `"users-administrator"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct RoleName(pub String);

/// API name of a permission, e.g. `"modify-roles-users"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PermissionName(pub String);

impl RoleName {
    /// Create a role name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the API name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PermissionName {
    /// Create a permission name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the API name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&str> for PermissionName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
