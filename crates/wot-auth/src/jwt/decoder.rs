//! Access token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use wot_core::config::AuthConfig;
use wot_core::error::AppError;

use super::claims::AccessClaims;

/// Why an access token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Signed with another key or algorithm.
    #[error("invalid token signature")]
    InvalidSignature,
    /// Past `exp` plus the allowed clock skew.
    #[error("token has expired")]
    Expired,
    /// Not a well-formed token carrying the expected claims.
    #[error("malformed token")]
    Malformed,
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Expired => AppError::unauthorized("Token has expired"),
            CodecError::InvalidSignature | CodecError::Malformed => {
                AppError::unauthorized("Invalid token")
            }
        }
    }
}

/// Verifies HS256 access tokens.
///
/// Expiry is checked here against a caller-supplied instant rather than by
/// `jsonwebtoken`, which would read the system clock.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
    leeway_seconds: i64,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl JwtDecoder {
    /// Create a decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            leeway_seconds: i64::try_from(config.clock_skew_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Verify signature and shape, then expiry relative to `now`.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, CodecError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                    CodecError::InvalidSignature
                }
                JwtErrorKind::ExpiredSignature => CodecError::Expired,
                _ => CodecError::Malformed,
            },
        )?;

        let claims = data.claims;
        if now.timestamp() >= claims.exp.saturating_add(self.leeway_seconds) {
            return Err(CodecError::Expired);
        }
        Ok(claims)
    }
}
