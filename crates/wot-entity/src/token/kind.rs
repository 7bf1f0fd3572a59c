//! Token kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three specializations of an opaque token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Refresh session token, owned by a user. Many may be valid at once.
    Refresh,
    /// Email verification token, owned by a credential. At most one valid.
    EmailVerification,
    /// Password reset token, owned by a credential. At most one valid.
    PasswordReset,
}

impl TokenKind {
    /// All kinds, in sweep order.
    pub const ALL: [TokenKind; 3] = [
        TokenKind::Refresh,
        TokenKind::EmailVerification,
        TokenKind::PasswordReset,
    ];

    /// Whether issuing a token of this kind retires the owner's previous ones.
    pub fn is_single_active(&self) -> bool {
        !matches!(self, Self::Refresh)
    }

    /// Return the kind as its storage string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = wot_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh" => Ok(Self::Refresh),
            "email_verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            _ => Err(wot_core::AppError::validation(format!(
                "Invalid token kind: '{s}'"
            ))),
        }
    }
}
