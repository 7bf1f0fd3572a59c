//! Outbound notification contract (email delivery lives outside this core).

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Template parameters handed to the notifier, e.g. `link` or `display_name`.
pub type NotificationParams = BTreeMap<String, String>;

/// The lifecycle messages this core sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Contains the email verification link.
    EmailVerification,
    /// Contains the password reset link.
    PasswordReset,
    /// Sent once the email address is verified.
    Welcome,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailVerification => write!(f, "email_verification"),
            Self::PasswordReset => write!(f, "password_reset"),
            Self::Welcome => write!(f, "welcome"),
        }
    }
}

/// Delivers a templated message to an address.
///
/// A returned error is logged by the caller and never aborts the lifecycle
/// operation that triggered the message.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Send `kind` to `address` with the given template parameters.
    async fn send(
        &self,
        address: &str,
        kind: NotificationKind,
        params: &NotificationParams,
    ) -> AppResult<()>;
}
