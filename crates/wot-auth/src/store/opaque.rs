//! Lifecycle operations over persisted opaque tokens.
//!
//! Callers only ever see plaintext token values at issuance; every lookup
//! goes through the SHA-256 digest. Validity is always decided against the
//! injected [`Clock`], never cached.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::traits::Clock;
use wot_core::types::{TokenId, Ttl};
use wot_database::repositories::{ConsumeEffect, ConsumeOutcome, RotateOutcome, TokenRepository};
use wot_entity::token::{IssuedToken, OpaqueToken, TokenKind, TokenState};

use super::secret;

/// Precise state of a presented token value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    /// Stored, not invalidated and not yet expired.
    Valid(OpaqueToken),
    /// Stored and never invalidated, but past its expiry.
    Expired(OpaqueToken),
    /// Stored and explicitly invalidated.
    Invalidated(OpaqueToken),
    /// No token of that kind has this value.
    Missing,
}

/// Issues, looks up and retires opaque tokens of every kind.
#[derive(Clone)]
pub struct OpaqueTokenStore {
    repo: Arc<dyn TokenRepository>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OpaqueTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaqueTokenStore").finish()
    }
}

impl OpaqueTokenStore {
    /// Create a store over the given repository and clock.
    pub fn new(repo: Arc<dyn TokenRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// The clock every validity decision is made against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn mint(&self, owner_id: Uuid, kind: TokenKind, ttl: Ttl) -> AppResult<IssuedToken> {
        let now = self.clock.now();
        let expires_at = ttl.expires_at(now)?;
        let value = secret::generate_value();
        let token = OpaqueToken {
            id: TokenId::generate(),
            kind,
            owner_id,
            token_hash: secret::digest(&value),
            issued_at: now,
            expires_at,
            invalidated_at: None,
        };
        Ok(IssuedToken { value, token })
    }

    /// Issue an additional token for `owner_id`. Existing tokens are untouched.
    pub async fn issue(&self, owner_id: Uuid, kind: TokenKind, ttl: Ttl) -> AppResult<IssuedToken> {
        let issued = self.mint(owner_id, kind, ttl)?;
        self.repo.insert(&issued.token).await?;

        debug!(
            token_id = %issued.token.id,
            kind = %kind,
            owner_id = %owner_id,
            expires_at = %issued.token.expires_at,
            "Issued token"
        );
        Ok(issued)
    }

    /// Issue a token after invalidating every other live token of
    /// `(owner_id, kind)`, as one unit.
    pub async fn issue_exclusive(
        &self,
        owner_id: Uuid,
        kind: TokenKind,
        ttl: Ttl,
    ) -> AppResult<IssuedToken> {
        let issued = self.mint(owner_id, kind, ttl)?;
        let retired = self
            .repo
            .insert_exclusive(&issued.token, issued.token.issued_at)
            .await?;

        debug!(
            token_id = %issued.token.id,
            kind = %kind,
            owner_id = %owner_id,
            retired = retired,
            "Issued exclusive token"
        );
        Ok(issued)
    }

    /// Invalidate one token. Returns `false` if it was already invalidated.
    pub async fn invalidate(&self, token: &OpaqueToken) -> AppResult<bool> {
        let changed = self.repo.invalidate(token.id, self.clock.now()).await?;
        if changed {
            debug!(token_id = %token.id, kind = %token.kind, "Invalidated token");
        }
        Ok(changed)
    }

    /// Invalidate every currently valid token of `kind` owned by `owner_id`.
    pub async fn invalidate_all_valid_for_owner(
        &self,
        owner_id: Uuid,
        kind: TokenKind,
    ) -> AppResult<u64> {
        let count = self
            .repo
            .invalidate_all_for_owner(owner_id, kind, self.clock.now())
            .await?;
        debug!(owner_id = %owner_id, kind = %kind, count = count, "Invalidated owner tokens");
        Ok(count)
    }

    /// Classify a presented value.
    pub async fn lookup(&self, value: &str, kind: TokenKind) -> AppResult<TokenLookup> {
        let found = self.repo.find_by_hash(kind, &secret::digest(value)).await?;
        let Some(token) = found else {
            return Ok(TokenLookup::Missing);
        };

        Ok(match token.state(self.clock.now()) {
            TokenState::Valid => TokenLookup::Valid(token),
            TokenState::Expired => TokenLookup::Expired(token),
            TokenState::Invalidated => TokenLookup::Invalidated(token),
        })
    }

    /// Return the token for `value` if it is currently valid.
    ///
    /// Fails with `NotFound` when no such token exists and with `Expired`
    /// when it exists but is expired or invalidated.
    pub async fn find_valid(&self, value: &str, kind: TokenKind) -> AppResult<OpaqueToken> {
        match self.lookup(value, kind).await? {
            TokenLookup::Valid(token) => Ok(token),
            TokenLookup::Expired(_) | TokenLookup::Invalidated(_) => {
                Err(AppError::expired("Token expired."))
            }
            TokenLookup::Missing => Err(AppError::not_found("Token not found.")),
        }
    }

    /// Atomically retire the refresh token `value` owned by `owner_id` and
    /// issue its replacement. `None` when the presented token was no longer
    /// valid at the moment of the write.
    pub async fn rotate(
        &self,
        value: &str,
        owner_id: Uuid,
        ttl: Ttl,
    ) -> AppResult<Option<IssuedToken>> {
        let replacement = self.mint(owner_id, TokenKind::Refresh, ttl)?;
        let outcome = self
            .repo
            .rotate(
                &secret::digest(value),
                &replacement.token,
                replacement.token.issued_at,
            )
            .await?;

        match outcome {
            RotateOutcome::Rotated { previous } => {
                debug!(
                    previous_id = %previous.id,
                    token_id = %replacement.token.id,
                    owner_id = %owner_id,
                    "Rotated refresh token"
                );
                Ok(Some(replacement))
            }
            RotateOutcome::Rejected => Ok(None),
        }
    }

    /// Atomically claim a single-use token and apply `effect`.
    pub async fn consume(
        &self,
        value: &str,
        kind: TokenKind,
        effect: ConsumeEffect,
    ) -> AppResult<ConsumeOutcome> {
        self.repo
            .consume(kind, &secret::digest(value), self.clock.now(), effect)
            .await
    }

    /// Delete tokens that expired more than `older_than` ago.
    pub async fn sweep_expired(&self, older_than: Ttl) -> AppResult<u64> {
        let cutoff = self.clock.now() - older_than.as_duration();
        let deleted = self.repo.delete_expired(cutoff).await?;
        if deleted > 0 {
            info!(deleted = deleted, cutoff = %cutoff, "Swept expired tokens");
        }
        Ok(deleted)
    }
}
