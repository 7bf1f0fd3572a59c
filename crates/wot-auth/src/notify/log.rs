//! Notifier that writes messages to the log instead of delivering them.

use async_trait::async_trait;
use tracing::info;

use wot_core::result::AppResult;
use wot_core::traits::{NotificationKind, NotificationParams, Notifier};

/// Logs each message's kind, recipient and parameter names.
///
/// Parameter values are left out because links carry live tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        address: &str,
        kind: NotificationKind,
        params: &NotificationParams,
    ) -> AppResult<()> {
        let fields: Vec<&str> = params.keys().map(String::as_str).collect();
        info!(
            address = %address,
            kind = %kind,
            params = ?fields,
            "Notification not delivered: no mail transport configured"
        );
        Ok(())
    }
}
