//! Periodic removal of long-expired tokens.

use std::sync::Arc;

use tracing::{error, info};

use wot_core::error::AppError;
use wot_core::types::Ttl;

use crate::store::OpaqueTokenStore;

/// Deletes tokens of every kind once they have been expired for longer
/// than the retention window.
///
/// This is storage hygiene only. Expired tokens are already rejected by
/// every lookup regardless of whether a sweep has run.
#[derive(Debug, Clone)]
pub struct TokenSweeper {
    store: Arc<OpaqueTokenStore>,
}

impl TokenSweeper {
    /// Create a sweeper over the token store.
    pub fn new(store: Arc<OpaqueTokenStore>) -> Self {
        Self { store }
    }

    /// Run one sweep. Returns the number of tokens deleted.
    pub async fn run_sweep(&self, retention: Ttl) -> Result<u64, AppError> {
        match self.store.sweep_expired(retention).await {
            Ok(deleted) => {
                info!(deleted = deleted, retention = %retention, "Token sweep completed");
                Ok(deleted)
            }
            Err(e) => {
                error!(error = %e, "Token sweep failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;
    use wot_core::traits::ManualClock;
    use wot_entity::token::TokenKind;

    use super::*;
    use crate::store::MemoryAuthStore;

    #[tokio::test]
    async fn test_sweep_removes_only_long_expired() {
        let clock = Arc::new(ManualClock::starting_now());
        let memory = Arc::new(MemoryAuthStore::new());
        let store = Arc::new(OpaqueTokenStore::new(memory.clone(), clock.clone()));
        let sweeper = TokenSweeper::new(store.clone());
        let owner = Uuid::new_v4();

        store
            .issue(owner, TokenKind::EmailVerification, Ttl::hours(1))
            .await
            .unwrap();
        store
            .issue(owner, TokenKind::Refresh, Ttl::days(7))
            .await
            .unwrap();

        clock.advance(Duration::days(2));
        assert_eq!(sweeper.run_sweep(Ttl::days(1)).await.unwrap(), 1);

        assert!(
            memory
                .tokens_for_owner(owner, TokenKind::EmailVerification)
                .await
                .is_empty()
        );
        assert_eq!(
            memory.tokens_for_owner(owner, TokenKind::Refresh).await.len(),
            1
        );
    }
}
