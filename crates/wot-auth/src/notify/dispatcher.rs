//! Builds lifecycle messages and hands them to the configured [`Notifier`].
//!
//! Delivery failures are logged and swallowed: a verification or reset
//! token that was issued stays issued even if the mail never leaves.

use std::sync::Arc;

use tracing::{debug, error};

use wot_core::config::NotificationConfig;
use wot_core::traits::{NotificationKind, NotificationParams, Notifier};

/// Sends the verification, password reset and welcome messages.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    config: NotificationConfig,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.config)
            .finish()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    pub fn new(notifier: Arc<dyn Notifier>, config: NotificationConfig) -> Self {
        Self { notifier, config }
    }

    /// Send the email verification link.
    pub async fn send_verification(&self, address: &str, display_name: &str, token: &str) {
        let params = params([
            ("display_name", display_name.to_string()),
            ("link", self.config.verification_link(token)),
        ]);
        self.dispatch(address, NotificationKind::EmailVerification, params)
            .await;
    }

    /// Send the password reset link.
    pub async fn send_password_reset(&self, address: &str, display_name: &str, token: &str) {
        let params = params([
            ("display_name", display_name.to_string()),
            ("link", self.config.reset_link(token)),
        ]);
        self.dispatch(address, NotificationKind::PasswordReset, params)
            .await;
    }

    /// Send the welcome message after verification.
    pub async fn send_welcome(&self, address: &str, display_name: &str) {
        let params = params([("display_name", display_name.to_string())]);
        self.dispatch(address, NotificationKind::Welcome, params)
            .await;
    }

    async fn dispatch(&self, address: &str, kind: NotificationKind, params: NotificationParams) {
        match self.notifier.send(address, kind, &params).await {
            Ok(()) => debug!(kind = %kind, "Notification sent"),
            Err(e) => error!(kind = %kind, error = %e, "Failed to send notification"),
        }
    }
}

fn params<const N: usize>(entries: [(&str, String); N]) -> NotificationParams {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
