//! Wiring of the whole credential lifecycle from configuration and
//! collaborators.

use std::sync::Arc;

use wot_core::config::{AuthConfig, NotificationConfig};
use wot_core::traits::{Clock, Notifier, PasswordHasher};
use wot_database::repositories::{IdentityRepository, TokenRepository};
use wot_entity::role::RoleName;

use crate::jwt::TokenCodec;
use crate::notify::NotificationDispatcher;
use crate::password::PasswordValidator;
use crate::rbac::AuthorizationEvaluator;
use crate::reset::PasswordResetManager;
use crate::service::{AuthService, AuthServiceParts};
use crate::session::{RefreshSessionManager, TokenSweeper};
use crate::store::OpaqueTokenStore;
use crate::verification::EmailVerificationManager;

/// Every lifecycle component, sharing one store, codec and clock.
#[derive(Debug, Clone)]
pub struct AuthComponents {
    /// Access token codec.
    pub codec: Arc<TokenCodec>,
    /// Opaque token store.
    pub store: Arc<OpaqueTokenStore>,
    /// Refresh session manager.
    pub sessions: Arc<RefreshSessionManager>,
    /// Email verification manager.
    pub verification: Arc<EmailVerificationManager>,
    /// Password reset manager.
    pub reset: Arc<PasswordResetManager>,
    /// Authorization evaluator.
    pub authorization: Arc<AuthorizationEvaluator>,
    /// Account flow facade.
    pub service: Arc<AuthService>,
    /// Expired token sweeper.
    pub sweeper: Arc<TokenSweeper>,
}

impl AuthComponents {
    /// Build all components.
    pub fn build(
        auth: &AuthConfig,
        notifications: &NotificationConfig,
        tokens: Arc<dyn TokenRepository>,
        identity: Arc<dyn IdentityRepository>,
        hasher: Arc<dyn PasswordHasher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(auth, clock.clone()));
        let store = Arc::new(OpaqueTokenStore::new(tokens, clock.clone()));
        let validator = PasswordValidator::new(auth);

        let sessions = Arc::new(RefreshSessionManager::new(
            store.clone(),
            identity.clone(),
            codec.clone(),
            auth.refresh_token_ttl,
        ));
        let verification = Arc::new(EmailVerificationManager::new(
            store.clone(),
            auth.email_verification_ttl,
        ));
        let reset = Arc::new(PasswordResetManager::new(
            store.clone(),
            hasher.clone(),
            validator.clone(),
            auth.password_reset_ttl,
        ));
        let authorization = Arc::new(AuthorizationEvaluator::new(identity.clone()));
        let sweeper = Arc::new(TokenSweeper::new(store.clone()));

        let service = Arc::new(AuthService::new(AuthServiceParts {
            identity,
            hasher,
            validator,
            codec: codec.clone(),
            sessions: sessions.clone(),
            verification: verification.clone(),
            reset: reset.clone(),
            authorization: authorization.clone(),
            notifications: NotificationDispatcher::new(notifier, notifications.clone()),
            clock,
            default_roles: auth.default_roles.iter().map(RoleName::new).collect(),
        }));

        Self {
            codec,
            store,
            sessions,
            verification,
            reset,
            authorization,
            service,
            sweeper,
        }
    }
}
