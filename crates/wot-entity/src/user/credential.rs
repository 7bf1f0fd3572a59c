//! Email/password credential owned by a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wot_core::types::{CredentialId, UserId};

/// The single login credential of a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Credential {
    /// Credential identifier; owner of verification and reset tokens.
    pub id: CredentialId,
    /// Owning user (unique: one credential per user).
    pub user_id: UserId,
    /// Login email, stored normalized (see [`normalize_email`]).
    pub email: String,
    /// Password hash produced by the configured hasher.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the email address has been confirmed.
    pub email_verified: bool,
    /// When the credential was created.
    pub created_at: DateTime<Utc>,
    /// When the credential was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Canonical form used for storage and lookup: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
