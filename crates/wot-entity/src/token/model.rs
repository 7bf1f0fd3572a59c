//! Opaque token row and its validity rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use wot_core::types::TokenId;

use super::kind::TokenKind;

/// A persisted, revocable, time-limited opaque token.
///
/// Only the SHA-256 digest of the random value is stored. The owner is a
/// user for refresh tokens and a credential for the other kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OpaqueToken {
    /// Row identifier.
    pub id: TokenId,
    /// Which flow this token belongs to.
    pub kind: TokenKind,
    /// Owning user or credential id, depending on `kind`.
    pub owner_id: Uuid,
    /// Hex SHA-256 of the token value.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// Instant from which the token is no longer valid.
    pub expires_at: DateTime<Utc>,
    /// Set once when the token is revoked or consumed.
    pub invalidated_at: Option<DateTime<Utc>>,
}

/// Validity of a token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Not invalidated and not yet expired.
    Valid,
    /// Never invalidated but `now >= expires_at`.
    Expired,
    /// Explicitly revoked or already consumed.
    Invalidated,
}

impl OpaqueToken {
    /// Classify the token at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if self.invalidated_at.is_some() {
            TokenState::Invalidated
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Valid
        }
    }

    /// `invalidated_at IS NULL AND now < expires_at`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == TokenState::Valid
    }
}

/// A freshly issued token together with its plaintext value.
///
/// This is the only place the plaintext exists; it is handed to the client
/// and never persisted.
#[derive(Clone)]
pub struct IssuedToken {
    /// The plaintext opaque value to hand to the client.
    pub value: String,
    /// The stored row.
    pub token: OpaqueToken,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"<redacted>")
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration) -> OpaqueToken {
        let now = Utc::now();
        OpaqueToken {
            id: TokenId::generate(),
            kind: TokenKind::Refresh,
            owner_id: Uuid::new_v4(),
            token_hash: "00".repeat(32),
            issued_at: now,
            expires_at: now + expires_in,
            invalidated_at: None,
        }
    }

    #[test]
    fn test_valid_until_expiry() {
        let t = token(Duration::minutes(10));
        assert_eq!(t.state(t.issued_at), TokenState::Valid);
        assert_eq!(t.state(t.expires_at), TokenState::Expired);
    }

    #[test]
    fn test_invalidated_takes_precedence() {
        let mut t = token(Duration::minutes(10));
        t.invalidated_at = Some(t.issued_at);
        assert_eq!(t.state(t.issued_at), TokenState::Invalidated);
        assert_eq!(t.state(t.expires_at), TokenState::Invalidated);
        assert!(!t.is_valid(t.issued_at));
    }
}
