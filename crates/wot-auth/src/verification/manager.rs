//! Issuance and redemption of email verification tokens.

use std::sync::Arc;

use tracing::{debug, info};

use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::types::{CredentialId, Ttl};
use wot_database::repositories::{ConsumeEffect, ConsumeOutcome};
use wot_entity::token::{IssuedToken, TokenKind};
use wot_entity::user::Credential;

use crate::store::OpaqueTokenStore;

/// Issues single-use verification tokens and marks emails verified.
///
/// At most one verification token per credential is valid at a time.
#[derive(Debug, Clone)]
pub struct EmailVerificationManager {
    store: Arc<OpaqueTokenStore>,
    ttl: Ttl,
}

impl EmailVerificationManager {
    /// Create a manager issuing tokens that live for `ttl`.
    pub fn new(store: Arc<OpaqueTokenStore>, ttl: Ttl) -> Self {
        Self { store, ttl }
    }

    /// Issue a fresh token for the credential, retiring any previous one.
    pub async fn issue_verification(&self, credential_id: CredentialId) -> AppResult<IssuedToken> {
        let issued = self
            .store
            .issue_exclusive(
                credential_id.into_uuid(),
                TokenKind::EmailVerification,
                self.ttl,
            )
            .await?;

        debug!(credential_id = %credential_id, token_id = %issued.token.id, "Verification token issued");
        Ok(issued)
    }

    /// Redeem a token and mark the owning credential's email as verified.
    ///
    /// Unknown, already used and superseded tokens fail with `NotFound`;
    /// a token past its lifetime fails with `Expired`.
    pub async fn consume(&self, value: &str) -> AppResult<Credential> {
        let outcome = self
            .store
            .consume(value, TokenKind::EmailVerification, ConsumeEffect::VerifyEmail)
            .await?;

        match outcome {
            ConsumeOutcome::Consumed { credential, .. } => {
                info!(
                    credential_id = %credential.id,
                    user_id = %credential.user_id,
                    "Email verified"
                );
                Ok(credential)
            }
            ConsumeOutcome::Expired => Err(AppError::expired("Verification token expired.")),
            ConsumeOutcome::Missing => Err(AppError::not_found("Verification token not found.")),
        }
    }
}
