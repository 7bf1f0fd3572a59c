//! Repository contracts.
//!
//! The lifecycle managers depend only on these traits. Two implementations
//! exist: the PostgreSQL repositories in this crate and the in-memory store
//! in `wot-auth`. Both must honour the same atomicity: each method is one
//! all-or-nothing unit, and the conditional writes (`rotate`, `consume`,
//! `invalidate`) only touch rows whose `invalidated_at` is still NULL.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use wot_core::result::AppResult;
use wot_core::types::{CredentialId, TokenId, UserId};
use wot_entity::role::{PermissionName, RoleName};
use wot_entity::token::{OpaqueToken, TokenKind};
use wot_entity::user::{Credential, User};

/// Side effect applied to the owning credential when a single-use token is
/// consumed, inside the same transaction as the claim.
#[derive(Clone)]
pub enum ConsumeEffect {
    /// Mark the credential's email as verified.
    VerifyEmail,
    /// Store a new password hash, retire the credential's remaining reset
    /// tokens and every valid refresh token of the owning user.
    ResetPassword {
        /// Hash of the new password.
        password_hash: String,
    },
}

impl std::fmt::Debug for ConsumeEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VerifyEmail => f.write_str("VerifyEmail"),
            Self::ResetPassword { .. } => f.write_str("ResetPassword"),
        }
    }
}

/// Result of a single-use token claim.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// The token was claimed and the effect applied.
    Consumed {
        /// The credential after the effect.
        credential: Credential,
        /// Refresh tokens retired as part of the effect.
        sessions_revoked: u64,
    },
    /// A never-invalidated token exists but is past its expiry.
    Expired,
    /// No such token, or it was already used or revoked.
    Missing,
}

/// Result of a refresh token rotation.
#[derive(Debug, Clone)]
pub enum RotateOutcome {
    /// The presented token was retired and the replacement stored.
    Rotated {
        /// The presented token, now invalidated.
        previous: OpaqueToken,
    },
    /// The presented token was not valid at the moment of the write.
    Rejected,
}

/// Input for creating a user together with its credential.
#[derive(Clone)]
pub struct NewAccount {
    /// Display name of the new user.
    pub display_name: String,
    /// Normalized login email.
    pub email: String,
    /// Hash of the initial password.
    pub password_hash: String,
    /// Role API names to assign.
    pub roles: Vec<RoleName>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish()
    }
}

/// A user and its credential, as created together.
#[derive(Debug, Clone)]
pub struct Account {
    /// The user row.
    pub user: User,
    /// The credential row.
    pub credential: Credential,
}

/// Persistence of opaque tokens.
#[async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    /// Store a new token.
    async fn insert(&self, token: &OpaqueToken) -> AppResult<()>;

    /// Invalidate every not-yet-invalidated token of `(token.owner_id,
    /// token.kind)` and store `token`, serialized per owner and kind.
    ///
    /// Returns how many previous tokens were invalidated.
    async fn insert_exclusive(&self, token: &OpaqueToken, now: DateTime<Utc>) -> AppResult<u64>;

    /// Find a token of `kind` by the digest of its value, in any state.
    async fn find_by_hash(&self, kind: TokenKind, token_hash: &str)
    -> AppResult<Option<OpaqueToken>>;

    /// Set `invalidated_at = now` if still NULL. Returns whether a row changed.
    async fn invalidate(&self, id: TokenId, now: DateTime<Utc>) -> AppResult<bool>;

    /// Invalidate every currently valid token of `kind` owned by `owner_id`.
    async fn invalidate_all_for_owner(
        &self,
        owner_id: Uuid,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Retire the refresh token with digest `token_hash` owned by
    /// `replacement.owner_id` and store `replacement`, atomically.
    ///
    /// The retirement is conditional on the token still being valid at
    /// `now`; of two concurrent rotations of one token exactly one sees
    /// [`RotateOutcome::Rotated`].
    async fn rotate(
        &self,
        token_hash: &str,
        replacement: &OpaqueToken,
        now: DateTime<Utc>,
    ) -> AppResult<RotateOutcome>;

    /// Claim a valid single-use token and apply `effect` to the owning
    /// credential, atomically.
    async fn consume(
        &self,
        kind: TokenKind,
        token_hash: &str,
        now: DateTime<Utc>,
        effect: ConsumeEffect,
    ) -> AppResult<ConsumeOutcome>;

    /// Delete tokens whose `expires_at` is before `cutoff`. Returns the count.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Read access to users, credentials and role reference data, plus the
/// single write path this core owns: account creation.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Create a user, assign roles and create the credential in one unit.
    ///
    /// Fails with `Conflict` if the email is taken and with `Validation`
    /// if a role name is unknown.
    async fn create_account(&self, account: &NewAccount, now: DateTime<Utc>) -> AppResult<Account>;

    /// Look up a user by internal id.
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>>;

    /// Look up a credential by id.
    async fn find_credential(&self, id: CredentialId) -> AppResult<Option<Credential>>;

    /// Look up a credential by normalized email.
    async fn find_credential_by_email(&self, email: &str) -> AppResult<Option<Credential>>;

    /// Current role assignments of a user, sorted by name.
    async fn role_names(&self, user_id: UserId) -> AppResult<Vec<RoleName>>;

    /// Union of the permissions of every role assigned to the user.
    async fn effective_permissions(&self, user_id: UserId) -> AppResult<HashSet<PermissionName>>;
}
