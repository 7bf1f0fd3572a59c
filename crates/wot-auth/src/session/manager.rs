//! Refresh session lifecycle: creation, rotation and revocation.
//!
//! A session is one refresh token owned by a user. Users may hold any
//! number of sessions at once; each rotation retires the presented token
//! and issues exactly one replacement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::types::{Ttl, UserId};
use wot_database::repositories::IdentityRepository;
use wot_entity::token::{IssuedToken, TokenKind};
use wot_entity::user::User;

use crate::jwt::TokenCodec;
use crate::store::{OpaqueTokenStore, TokenLookup};

const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token.";

/// Access token plus the refresh token that renews it.
#[derive(Clone)]
pub struct TokenPair {
    /// Signed access token.
    pub access_token: String,
    /// Opaque refresh token value.
    pub refresh_token: String,
    /// Access token expiration.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration.
    pub refresh_expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}

/// Manages refresh sessions.
#[derive(Clone)]
pub struct RefreshSessionManager {
    store: Arc<OpaqueTokenStore>,
    identity: Arc<dyn IdentityRepository>,
    codec: Arc<TokenCodec>,
    refresh_ttl: Ttl,
}

impl std::fmt::Debug for RefreshSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshSessionManager")
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl RefreshSessionManager {
    /// Create a session manager.
    pub fn new(
        store: Arc<OpaqueTokenStore>,
        identity: Arc<dyn IdentityRepository>,
        codec: Arc<TokenCodec>,
        refresh_ttl: Ttl,
    ) -> Self {
        Self {
            store,
            identity,
            codec,
            refresh_ttl,
        }
    }

    /// Open an additional session for `user_id`.
    pub async fn create_session(&self, user_id: UserId) -> AppResult<IssuedToken> {
        let issued = self
            .store
            .issue(user_id.into_uuid(), TokenKind::Refresh, self.refresh_ttl)
            .await?;

        info!(user_id = %user_id, token_id = %issued.token.id, "Session created");
        Ok(issued)
    }

    /// Open a session for an authenticated user and sign its first access
    /// token with the user's current roles.
    pub async fn start_session(&self, user: &User) -> AppResult<TokenPair> {
        let roles = self.identity.role_names(user.id).await?;
        let access = self
            .codec
            .issue_access_token(user.id, user.public_id, &roles)?;
        let refresh = self.create_session(user.id).await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.value,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.token.expires_at,
        })
    }

    /// Resolve the user owning a currently valid refresh token.
    pub async fn owner_of(&self, presented: &str) -> AppResult<UserId> {
        match self.store.lookup(presented, TokenKind::Refresh).await? {
            TokenLookup::Valid(token) => Ok(UserId::from(token.owner_id)),
            other => {
                log_rejected(&other);
                Err(AppError::unauthorized(INVALID_REFRESH_TOKEN))
            }
        }
    }

    /// Exchange a valid refresh token for a new access and refresh token.
    ///
    /// Of any number of concurrent rotations of the same token exactly one
    /// succeeds; the rest fail with `Unauthorized`.
    pub async fn rotate(&self, presented: &str) -> AppResult<TokenPair> {
        let user_id = self.owner_of(presented).await?;

        let user = self
            .identity
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_REFRESH_TOKEN))?;
        let roles = self.identity.role_names(user_id).await?;
        // Signed before the presented token is spent.
        let access = self
            .codec
            .issue_access_token(user.id, user.public_id, &roles)?;

        let Some(replacement) = self
            .store
            .rotate(presented, user_id.into_uuid(), self.refresh_ttl)
            .await?
        else {
            warn!(user_id = %user_id, "Refresh token was spent concurrently");
            return Err(AppError::unauthorized(INVALID_REFRESH_TOKEN));
        };

        info!(
            user_id = %user_id,
            token_id = %replacement.token.id,
            "Refresh token rotated"
        );

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: replacement.value,
            access_expires_at: access.expires_at,
            refresh_expires_at: replacement.token.expires_at,
        })
    }

    /// End the session identified by `presented`.
    ///
    /// Repeating the call for an already ended session succeeds; a value
    /// that was never issued fails with `Unauthorized`.
    pub async fn revoke_one(&self, presented: &str) -> AppResult<()> {
        let token = match self.store.lookup(presented, TokenKind::Refresh).await? {
            TokenLookup::Valid(token)
            | TokenLookup::Expired(token)
            | TokenLookup::Invalidated(token) => token,
            TokenLookup::Missing => return Err(AppError::unauthorized(INVALID_REFRESH_TOKEN)),
        };

        let changed = self.store.invalidate(&token).await?;
        info!(
            user_id = %token.owner_id,
            token_id = %token.id,
            changed = changed,
            "Session revoked"
        );
        Ok(())
    }

    /// End every session of `user_id`. Returns how many were open.
    pub async fn revoke_all(&self, user_id: UserId) -> AppResult<u64> {
        let count = self
            .store
            .invalidate_all_valid_for_owner(user_id.into_uuid(), TokenKind::Refresh)
            .await?;

        info!(user_id = %user_id, count = count, "All sessions revoked");
        Ok(count)
    }
}

fn log_rejected(lookup: &TokenLookup) {
    match lookup {
        TokenLookup::Invalidated(token) => warn!(
            user_id = %token.owner_id,
            token_id = %token.id,
            "Revoked refresh token presented"
        ),
        TokenLookup::Expired(token) => debug!(
            user_id = %token.owner_id,
            token_id = %token.id,
            "Expired refresh token presented"
        ),
        TokenLookup::Missing => debug!("Unknown refresh token presented"),
        TokenLookup::Valid(_) => {}
    }
}
