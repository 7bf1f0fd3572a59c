//! Issuance and redemption of password reset tokens.

use std::sync::Arc;

use tracing::{debug, info};

use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::traits::PasswordHasher;
use wot_core::types::{CredentialId, Ttl};
use wot_database::repositories::{ConsumeEffect, ConsumeOutcome};
use wot_entity::token::{IssuedToken, TokenKind};
use wot_entity::user::Credential;

use crate::password::PasswordValidator;
use crate::store::OpaqueTokenStore;

/// Issues single-use reset tokens and applies new passwords.
///
/// A successful reset ends every refresh session of the user in the same
/// transaction that stores the new hash.
#[derive(Clone)]
pub struct PasswordResetManager {
    store: Arc<OpaqueTokenStore>,
    hasher: Arc<dyn PasswordHasher>,
    validator: PasswordValidator,
    ttl: Ttl,
}

impl std::fmt::Debug for PasswordResetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetManager")
            .field("validator", &self.validator)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl PasswordResetManager {
    /// Create a manager issuing tokens that live for `ttl`.
    pub fn new(
        store: Arc<OpaqueTokenStore>,
        hasher: Arc<dyn PasswordHasher>,
        validator: PasswordValidator,
        ttl: Ttl,
    ) -> Self {
        Self {
            store,
            hasher,
            validator,
            ttl,
        }
    }

    /// Issue a fresh token for the credential, retiring any previous one.
    pub async fn issue_reset(&self, credential_id: CredentialId) -> AppResult<IssuedToken> {
        let issued = self
            .store
            .issue_exclusive(credential_id.into_uuid(), TokenKind::PasswordReset, self.ttl)
            .await?;

        debug!(credential_id = %credential_id, token_id = %issued.token.id, "Reset token issued");
        Ok(issued)
    }

    /// Redeem a token and set `new_password`.
    ///
    /// The password is checked against policy before the token is touched,
    /// so a rejected password leaves the token usable.
    pub async fn consume(&self, value: &str, new_password: &str) -> AppResult<Credential> {
        self.validator.validate(new_password, &[])?;
        let password_hash = self.hasher.hash(new_password)?;

        let outcome = self
            .store
            .consume(
                value,
                TokenKind::PasswordReset,
                ConsumeEffect::ResetPassword { password_hash },
            )
            .await?;

        match outcome {
            ConsumeOutcome::Consumed {
                credential,
                sessions_revoked,
            } => {
                info!(
                    credential_id = %credential.id,
                    user_id = %credential.user_id,
                    sessions_revoked = sessions_revoked,
                    "Password reset"
                );
                Ok(credential)
            }
            ConsumeOutcome::Expired => Err(AppError::expired("Reset token expired.")),
            ConsumeOutcome::Missing => Err(AppError::not_found("Reset token not found.")),
        }
    }
}
