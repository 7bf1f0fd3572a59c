//! Outbound notification configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings used to build the links embedded in lifecycle emails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Public base URL of the web client, without trailing slash.
    pub frontend_url: String,
}

impl NotificationConfig {
    /// Validate the base URL shape.
    pub fn validate(&self) -> Result<(), AppError> {
        let url = self.frontend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::configuration(
                "notifications.frontend_url must be an http(s) URL",
            ));
        }
        Ok(())
    }

    /// Link sent in the email verification message.
    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/auth/verify-email?token={token}", self.base())
    }

    /// Link sent in the password reset message.
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/auth/reset-password?token={token}", self.base())
    }

    fn base(&self) -> &str {
        self.frontend_url.trim().trim_end_matches('/')
    }
}
