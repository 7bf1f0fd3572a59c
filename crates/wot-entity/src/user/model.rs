//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use wot_core::types::UserId;

/// A registered user.
///
/// Role assignments are not embedded; they are looked up by `id` through
/// the identity repository whenever they are needed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Internal identifier. Only ever travels inside signed tokens.
    #[serde(skip_serializing)]
    pub id: UserId,
    /// Opaque identifier safe to expose to clients.
    pub public_id: Uuid,
    /// Human-readable display name.
    pub display_name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_id_not_serialized() {
        let user = User {
            id: UserId::generate(),
            public_id: Uuid::new_v4(),
            display_name: "Ana".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["display_name"], "Ana");
    }
}
