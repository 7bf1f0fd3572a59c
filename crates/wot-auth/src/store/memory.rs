//! In-memory repositories using a Tokio mutex, for tests and single-node
//! development runs.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::types::{CredentialId, TokenId, UserId};
use wot_database::repositories::{
    Account, ConsumeEffect, ConsumeOutcome, IdentityRepository, NewAccount, RotateOutcome,
    TokenRepository,
};
use wot_entity::role::{PermissionName, RoleName};
use wot_entity::token::{OpaqueToken, TokenKind, TokenState};
use wot_entity::user::{Credential, User};

/// Everything the store holds, guarded by one lock so each trait method is
/// a single atomic step.
#[derive(Debug, Default)]
struct InnerState {
    users: HashMap<UserId, User>,
    credentials: HashMap<CredentialId, Credential>,
    roles: HashMap<RoleName, HashSet<PermissionName>>,
    user_roles: HashMap<UserId, BTreeSet<RoleName>>,
    tokens: Vec<OpaqueToken>,
}

impl InnerState {
    fn token_mut(&mut self, kind: TokenKind, token_hash: &str) -> Option<&mut OpaqueToken> {
        self.tokens
            .iter_mut()
            .find(|t| t.kind == kind && t.token_hash == token_hash)
    }

    fn hash_taken(&self, token_hash: &str) -> bool {
        self.tokens.iter().any(|t| t.token_hash == token_hash)
    }

    fn invalidate_where(
        &mut self,
        now: DateTime<Utc>,
        mut pred: impl FnMut(&OpaqueToken) -> bool,
    ) -> u64 {
        let mut count = 0;
        for token in self.tokens.iter_mut().filter(|t| pred(t)) {
            token.invalidated_at = Some(now);
            count += 1;
        }
        count
    }
}

/// Token and identity repository backed by process memory.
///
/// Implements both [`TokenRepository`] and [`IdentityRepository`] with the
/// same atomicity as the PostgreSQL repositories.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryAuthStore {
    /// Create an empty store with no roles defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a role and the permissions it grants.
    pub async fn define_role<I, P>(&self, name: impl Into<RoleName>, permissions: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionName>,
    {
        let mut state = self.state.lock().await;
        state.roles.insert(
            name.into(),
            permissions.into_iter().map(Into::into).collect(),
        );
    }

    /// Assign a defined role to a user.
    pub async fn assign_role(&self, user_id: UserId, role: impl Into<RoleName>) -> AppResult<()> {
        let role = role.into();
        let mut state = self.state.lock().await;
        if !state.roles.contains_key(&role) {
            return Err(AppError::validation(format!("Unknown role '{role}'")));
        }
        if !state.users.contains_key(&user_id) {
            return Err(AppError::not_found(format!("User {user_id} not found")));
        }
        state.user_roles.entry(user_id).or_default().insert(role);
        Ok(())
    }

    /// Remove a role assignment. Returns whether the user had it.
    pub async fn unassign_role(&self, user_id: UserId, role: impl Into<RoleName>) -> bool {
        let role = role.into();
        let mut state = self.state.lock().await;
        state
            .user_roles
            .get_mut(&user_id)
            .is_some_and(|roles| roles.remove(&role))
    }

    /// Every stored token of `(owner_id, kind)` in issuance order.
    pub async fn tokens_for_owner(&self, owner_id: Uuid, kind: TokenKind) -> Vec<OpaqueToken> {
        let state = self.state.lock().await;
        let mut tokens: Vec<OpaqueToken> = state
            .tokens
            .iter()
            .filter(|t| t.owner_id == owner_id && t.kind == kind)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| (t.issued_at, t.id));
        tokens
    }
}

#[async_trait]
impl TokenRepository for MemoryAuthStore {
    async fn insert(&self, token: &OpaqueToken) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.hash_taken(&token.token_hash) {
            return Err(AppError::conflict("Token hash already stored"));
        }
        state.tokens.push(token.clone());
        Ok(())
    }

    async fn insert_exclusive(&self, token: &OpaqueToken, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        if state.hash_taken(&token.token_hash) {
            return Err(AppError::conflict("Token hash already stored"));
        }
        let retired = state.invalidate_where(now, |t| {
            t.owner_id == token.owner_id && t.kind == token.kind && t.invalidated_at.is_none()
        });
        state.tokens.push(token.clone());
        Ok(retired)
    }

    async fn find_by_hash(
        &self,
        kind: TokenKind,
        token_hash: &str,
    ) -> AppResult<Option<OpaqueToken>> {
        let state = self.state.lock().await;
        Ok(state
            .tokens
            .iter()
            .find(|t| t.kind == kind && t.token_hash == token_hash)
            .cloned())
    }

    async fn invalidate(&self, id: TokenId, now: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        Ok(state.invalidate_where(now, |t| t.id == id && t.invalidated_at.is_none()) > 0)
    }

    async fn invalidate_all_for_owner(
        &self,
        owner_id: Uuid,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        Ok(state.invalidate_where(now, |t| {
            t.owner_id == owner_id && t.kind == kind && t.is_valid(now)
        }))
    }

    async fn rotate(
        &self,
        token_hash: &str,
        replacement: &OpaqueToken,
        now: DateTime<Utc>,
    ) -> AppResult<RotateOutcome> {
        let mut state = self.state.lock().await;
        if state.hash_taken(&replacement.token_hash) {
            return Err(AppError::conflict("Token hash already stored"));
        }

        let Some(current) = state.token_mut(TokenKind::Refresh, token_hash) else {
            return Ok(RotateOutcome::Rejected);
        };
        if current.owner_id != replacement.owner_id || !current.is_valid(now) {
            return Ok(RotateOutcome::Rejected);
        }
        current.invalidated_at = Some(now);
        let previous = current.clone();

        state.tokens.push(replacement.clone());
        Ok(RotateOutcome::Rotated { previous })
    }

    async fn consume(
        &self,
        kind: TokenKind,
        token_hash: &str,
        now: DateTime<Utc>,
        effect: ConsumeEffect,
    ) -> AppResult<ConsumeOutcome> {
        let mut state = self.state.lock().await;

        let Some(token) = state.token_mut(kind, token_hash) else {
            return Ok(ConsumeOutcome::Missing);
        };
        match token.state(now) {
            TokenState::Valid => {}
            TokenState::Expired => return Ok(ConsumeOutcome::Expired),
            TokenState::Invalidated => return Ok(ConsumeOutcome::Missing),
        }
        let token_id = token.id;
        let credential_id = CredentialId::from(token.owner_id);

        // Check the owner before claiming so a dangling token stays unclaimed.
        let Some(credential) = state.credentials.get_mut(&credential_id) else {
            return Ok(ConsumeOutcome::Missing);
        };
        let mut sessions_revoked = 0;
        match effect {
            ConsumeEffect::VerifyEmail => {
                credential.email_verified = true;
                credential.updated_at = now;
            }
            ConsumeEffect::ResetPassword { password_hash } => {
                credential.password_hash = password_hash;
                credential.updated_at = now;
            }
        }
        let credential = credential.clone();

        state.invalidate_where(now, |t| t.id == token_id);
        if kind == TokenKind::PasswordReset {
            let owner = credential.id.into_uuid();
            let user = credential.user_id.into_uuid();
            state.invalidate_where(now, |t| {
                t.owner_id == owner && t.kind == TokenKind::PasswordReset && t.invalidated_at.is_none()
            });
            sessions_revoked = state.invalidate_where(now, |t| {
                t.owner_id == user && t.kind == TokenKind::Refresh && t.is_valid(now)
            });
        }

        Ok(ConsumeOutcome::Consumed {
            credential,
            sessions_revoked,
        })
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.tokens.len();
        state.tokens.retain(|t| t.expires_at >= cutoff);
        Ok((before - state.tokens.len()) as u64)
    }
}

#[async_trait]
impl IdentityRepository for MemoryAuthStore {
    async fn create_account(&self, account: &NewAccount, now: DateTime<Utc>) -> AppResult<Account> {
        let mut state = self.state.lock().await;

        if state.credentials.values().any(|c| c.email == account.email) {
            return Err(AppError::conflict("Email already in use."));
        }
        if let Some(unknown) = account.roles.iter().find(|r| !state.roles.contains_key(*r)) {
            return Err(AppError::validation(format!("Unknown role '{unknown}'")));
        }

        let user = User {
            id: UserId::generate(),
            public_id: Uuid::new_v4(),
            display_name: account.display_name.clone(),
            created_at: now,
        };
        let credential = Credential {
            id: CredentialId::generate(),
            user_id: user.id,
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            email_verified: false,
            created_at: now,
            updated_at: now,
        };

        state.users.insert(user.id, user.clone());
        state.credentials.insert(credential.id, credential.clone());
        state
            .user_roles
            .insert(user.id, account.roles.iter().cloned().collect());

        Ok(Account { user, credential })
    }

    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_credential(&self, id: CredentialId) -> AppResult<Option<Credential>> {
        Ok(self.state.lock().await.credentials.get(&id).cloned())
    }

    async fn find_credential_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        let state = self.state.lock().await;
        Ok(state
            .credentials
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn role_names(&self, user_id: UserId) -> AppResult<Vec<RoleName>> {
        let state = self.state.lock().await;
        Ok(state
            .user_roles
            .get(&user_id)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn effective_permissions(&self, user_id: UserId) -> AppResult<HashSet<PermissionName>> {
        let state = self.state.lock().await;
        let Some(assigned) = state.user_roles.get(&user_id) else {
            return Ok(HashSet::new());
        };
        Ok(assigned
            .iter()
            .filter_map(|role| state.roles.get(role))
            .flatten()
            .cloned()
            .collect())
    }
}
