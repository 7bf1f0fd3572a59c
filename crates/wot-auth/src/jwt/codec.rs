//! Clock-aware access token issuance and verification.

use std::sync::Arc;

use uuid::Uuid;

use wot_core::config::AuthConfig;
use wot_core::error::AppError;
use wot_core::traits::Clock;
use wot_core::types::UserId;
use wot_entity::role::RoleName;

use super::claims::AccessClaims;
use super::decoder::{CodecError, JwtDecoder};
use super::encoder::{AccessToken, JwtEncoder};

/// Issues and verifies access tokens against the injected clock.
#[derive(Clone)]
pub struct TokenCodec {
    encoder: JwtEncoder,
    decoder: JwtDecoder,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("encoder", &self.encoder)
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec from auth configuration.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoder: JwtEncoder::new(config),
            decoder: JwtDecoder::new(config),
            clock,
        }
    }

    /// Sign an access token for `subject` carrying a role snapshot.
    pub fn issue_access_token(
        &self,
        subject: UserId,
        public_id: Uuid,
        roles: &[RoleName],
    ) -> Result<AccessToken, AppError> {
        self.encoder.encode(subject, public_id, roles, self.clock.now())
    }

    /// Verify a presented access token.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, CodecError> {
        self.decoder.decode(token, self.clock.now())
    }
}
