//! Authorization decisions over a user's current role assignments.
//!
//! Decisions always read the live role and permission tables. The role
//! snapshot in an access token is never consulted, so a role change takes
//! effect on the very next request.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::types::UserId;
use wot_database::repositories::IdentityRepository;
use wot_entity::role::PermissionName;

/// Decides whether a user holds the permissions an action requires.
#[derive(Clone)]
pub struct AuthorizationEvaluator {
    identity: Arc<dyn IdentityRepository>,
}

impl std::fmt::Debug for AuthorizationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEvaluator").finish()
    }
}

impl AuthorizationEvaluator {
    /// Create an evaluator over the identity repository.
    pub fn new(identity: Arc<dyn IdentityRepository>) -> Self {
        Self { identity }
    }

    /// Union of the permissions granted by every role the user holds now.
    pub async fn effective_permissions(&self, user_id: UserId) -> AppResult<HashSet<PermissionName>> {
        self.identity.effective_permissions(user_id).await
    }

    /// `true` if the user holds at least one of `required`.
    ///
    /// An empty requirement is always satisfied.
    pub async fn authorize(&self, user_id: UserId, required: &[PermissionName]) -> AppResult<bool> {
        if required.is_empty() {
            return Ok(true);
        }
        let held = self.effective_permissions(user_id).await?;
        Ok(required.iter().any(|p| held.contains(p)))
    }

    /// `true` only if the user holds every one of `required`.
    pub async fn authorize_all(
        &self,
        user_id: UserId,
        required: &[PermissionName],
    ) -> AppResult<bool> {
        if required.is_empty() {
            return Ok(true);
        }
        let held = self.effective_permissions(user_id).await?;
        Ok(required.iter().all(|p| held.contains(p)))
    }

    /// Like [`authorize`](Self::authorize), failing with `Forbidden` on denial.
    pub async fn require(&self, user_id: UserId, required: &[PermissionName]) -> AppResult<()> {
        if self.authorize(user_id, required).await? {
            return Ok(());
        }
        debug!(user_id = %user_id, required = ?required, "Authorization denied");
        Err(AppError::forbidden("Insufficient permissions."))
    }
}
