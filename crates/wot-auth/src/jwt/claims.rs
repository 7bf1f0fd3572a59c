//! Claims carried by every access token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wot_core::types::UserId;
use wot_entity::role::RoleName;

/// Payload of a signed access token.
///
/// `roles` is a snapshot taken at issuance. It is informational only;
/// authorization always re-reads the user's current permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject, the internal user id.
    pub sub: UserId,
    /// Externally visible user id.
    pub public_id: Uuid,
    /// Role API names at issuance.
    pub roles: Vec<RoleName>,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

impl AccessClaims {
    /// The subject as a typed user id.
    pub fn user_id(&self) -> UserId {
        self.sub
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Whether the snapshot lists `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }
}
