//! Expired token sweep job.

use std::sync::Arc;

use tracing;

use wot_auth::TokenSweeper;
use wot_core::types::Ttl;

/// Deletes tokens that have been expired for longer than `retention`.
#[derive(Debug, Clone)]
pub struct TokenSweepJob {
    /// Sweeper over the token store
    sweeper: Arc<TokenSweeper>,
    /// How long expired tokens are kept before deletion
    retention: Ttl,
}

impl TokenSweepJob {
    /// Create a new sweep job
    pub fn new(sweeper: Arc<TokenSweeper>, retention: Ttl) -> Self {
        Self { sweeper, retention }
    }

    /// Run one sweep. Failures are logged and retried on the next tick.
    pub async fn run(&self) -> u64 {
        tracing::debug!("Running token sweep");
        match self.sweeper.run_sweep(self.retention).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(error = %e, "Token sweep failed; will retry on next schedule");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;
    use wot_auth::{MemoryAuthStore, OpaqueTokenStore};
    use wot_core::traits::ManualClock;
    use wot_entity::token::TokenKind;

    use super::*;

    #[tokio::test]
    async fn test_run_deletes_past_retention() {
        let clock = Arc::new(ManualClock::starting_now());
        let memory = Arc::new(MemoryAuthStore::new());
        let store = Arc::new(OpaqueTokenStore::new(memory.clone(), clock.clone()));
        let job = TokenSweepJob::new(Arc::new(TokenSweeper::new(store.clone())), Ttl::days(1));
        let owner = Uuid::new_v4();

        store
            .issue(owner, TokenKind::PasswordReset, Ttl::hours(1))
            .await
            .unwrap();
        store
            .issue(owner, TokenKind::Refresh, Ttl::days(7))
            .await
            .unwrap();

        assert_eq!(job.run().await, 0);

        clock.advance(Duration::hours(25));
        assert_eq!(job.run().await, 0);

        clock.advance(Duration::minutes(1));
        assert_eq!(job.run().await, 1);
        assert_eq!(
            memory.tokens_for_owner(owner, TokenKind::Refresh).await.len(),
            1
        );
    }
}
