//! Authentication configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::Ttl;

/// Minimum signing secret length in bytes for HS256.
const MIN_SECRET_BYTES: usize = 32;

/// Token lifetimes, signing secret and credential policy.
///
/// The secret and every TTL are required and have no fallback value.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for access token signing (HMAC-SHA256).
    pub jwt_secret: String,
    /// Lifetime of a signed access token.
    pub access_token_ttl: Ttl,
    /// Lifetime of a refresh session token.
    pub refresh_token_ttl: Ttl,
    /// Lifetime of an email verification token.
    pub email_verification_ttl: Ttl,
    /// Lifetime of a password reset token.
    pub password_reset_ttl: Ttl,
    /// Leeway in seconds applied when checking access token expiry.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_seconds: u64,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
    /// Role API names assigned to every self-registered user.
    #[serde(default = "default_roles")]
    pub default_roles: Vec<String>,
}

impl AuthConfig {
    /// Reject values that deserialize but cannot be used safely.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(AppError::configuration(format!(
                "auth.jwt_secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }
        if self.password_reset_ttl > self.email_verification_ttl {
            tracing::warn!(
                reset = %self.password_reset_ttl,
                verification = %self.email_verification_ttl,
                "Password reset tokens outlive email verification tokens"
            );
        }
        if self.password_min_length == 0 {
            return Err(AppError::configuration(
                "auth.password_min_length must be positive",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("email_verification_ttl", &self.email_verification_ttl)
            .field("password_reset_ttl", &self.password_reset_ttl)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("password_min_length", &self.password_min_length)
            .field("default_roles", &self.default_roles)
            .finish()
    }
}

fn default_clock_skew() -> u64 {
    5
}

fn default_password_min() -> usize {
    8
}

fn default_roles() -> Vec<String> {
    [
        "comments-user",
        "report-comments-user",
        "reaction-user",
        "report-toilets-user",
        "suggest-toilets-user",
        "report-users-user",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
