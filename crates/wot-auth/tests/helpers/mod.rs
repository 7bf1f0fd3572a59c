//! Shared test helpers for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use wot_auth::{AuthComponents, AuthService, LoginResult, MemoryAuthStore};
use wot_core::config::{AuthConfig, NotificationConfig};
use wot_core::error::AppError;
use wot_core::result::AppResult;
use wot_core::traits::{ManualClock, NotificationKind, NotificationParams, Notifier, PasswordHasher};
use wot_core::types::Ttl;
use wot_database::repositories::Account;

/// A password the policy accepts.
pub const PASSWORD: &str = "Gr33n-Porcelain-Throne-42!";

/// Another accepted password, for resets.
pub const NEW_PASSWORD: &str = "Bidet-Symphony-in-C-Minor-7";

/// One captured outbound message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub address: String,
    pub kind: NotificationKind,
    pub params: NotificationParams,
}

/// Notifier that records every message and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn fail_deliveries(&self, fail: bool) {
        *self.failing.lock().unwrap() = fail;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, address: &str, kind: NotificationKind) -> usize {
        self.sent()
            .iter()
            .filter(|m| m.address == address && m.kind == kind)
            .count()
    }

    /// Token embedded in the most recent link of `kind` sent to `address`.
    pub fn last_token(&self, address: &str, kind: NotificationKind) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|m| m.address == address && m.kind == kind)
            .and_then(|m| m.params.get("link"))
            .and_then(|link| link.split_once("token="))
            .map(|(_, token)| token.to_string())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        address: &str,
        kind: NotificationKind,
        params: &NotificationParams,
    ) -> AppResult<()> {
        self.sent.lock().unwrap().push(SentMessage {
            address: address.to_string(),
            kind,
            params: params.clone(),
        });
        if *self.failing.lock().unwrap() {
            return Err(AppError::external_service("mail relay unavailable"));
        }
        Ok(())
    }
}

/// Reversible stand-in for Argon2 so flows run quickly in debug builds.
#[derive(Debug, Default)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plain: &str) -> AppResult<String> {
        Ok(format!("plain${plain}"))
    }

    fn verify(&self, plain: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("plain$") == Some(plain))
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret-with-enough-bytes".to_string(),
        access_token_ttl: Ttl::minutes(15),
        refresh_token_ttl: Ttl::days(7),
        email_verification_ttl: Ttl::days(1),
        password_reset_ttl: Ttl::hours(1),
        clock_skew_seconds: 5,
        password_min_length: 8,
        default_roles: vec!["comments-user".to_string(), "reaction-user".to_string()],
    }
}

pub fn notification_config() -> NotificationConfig {
    NotificationConfig {
        frontend_url: "https://toilets.example.com".to_string(),
    }
}

/// Test application context over the in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryAuthStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub auth: AuthComponents,
}

impl TestApp {
    /// Create a context with the fast test hasher.
    pub async fn new() -> Self {
        Self::with_hasher(Arc::new(PlainHasher)).await
    }

    /// Create a context with the given password hasher.
    pub async fn with_hasher(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self::build(hasher, auth_config()).await
    }

    /// Create a context with custom lifetimes and the fast test hasher.
    pub async fn with_config(config: AuthConfig) -> Self {
        Self::build(Arc::new(PlainHasher), config).await
    }

    async fn build(hasher: Arc<dyn PasswordHasher>, config: AuthConfig) -> Self {
        let store = Arc::new(MemoryAuthStore::new());
        store
            .define_role("comments-user", ["create-comments", "edit-own-comments"])
            .await;
        store
            .define_role("reaction-user", ["create-reactions"])
            .await;
        store
            .define_role("comments-administrator", ["delete-comments", "edit-comments"])
            .await;

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        ));
        let notifier = Arc::new(RecordingNotifier::default());

        let auth = AuthComponents::build(
            &config,
            &notification_config(),
            store.clone(),
            store.clone(),
            hasher,
            notifier.clone(),
            clock.clone(),
        );

        Self {
            store,
            clock,
            notifier,
            auth,
        }
    }

    pub fn service(&self) -> &AuthService {
        &self.auth.service
    }

    /// Register with the default roles.
    pub async fn register(&self, name: &str, email: &str) -> Account {
        self.service()
            .register(name, email, PASSWORD)
            .await
            .expect("registration should succeed")
    }

    /// Register and redeem the mailed verification token.
    pub async fn register_verified(&self, name: &str, email: &str) -> Account {
        let account = self.register(name, email).await;
        let token = self
            .notifier
            .last_token(email, NotificationKind::EmailVerification)
            .expect("verification mail should carry a token");
        self.service()
            .verify_email(&token)
            .await
            .expect("verification should succeed");
        account
    }

    pub async fn login(&self, email: &str) -> LoginResult {
        self.service()
            .login(email, PASSWORD)
            .await
            .expect("login should succeed")
    }
}
