//! Access token signing.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use uuid::Uuid;

use wot_core::config::AuthConfig;
use wot_core::error::AppError;
use wot_core::types::{Ttl, UserId};
use wot_entity::role::RoleName;

use super::claims::AccessClaims;

/// A freshly signed access token.
#[derive(Clone)]
pub struct AccessToken {
    /// Compact JWS serialization.
    pub token: String,
    /// Instant after which the token is rejected (before skew leeway).
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Signs HS256 access tokens with the configured secret and lifetime.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    header: Header,
    ttl: Ttl,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").field("ttl", &self.ttl).finish()
    }
}

impl JwtEncoder {
    /// Create an encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            header: Header::new(Algorithm::HS256),
            ttl: config.access_token_ttl,
        }
    }

    /// Sign an access token issued at `now`.
    pub fn encode(
        &self,
        subject: UserId,
        public_id: Uuid,
        roles: &[RoleName],
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AppError> {
        let expires_at = self.ttl.expires_at(now)?;
        let claims = AccessClaims {
            sub: subject,
            public_id,
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;

        Ok(AccessToken { token, expires_at })
    }
}
