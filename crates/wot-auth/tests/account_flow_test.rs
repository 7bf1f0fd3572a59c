//! Integration tests for registration, verification and login.

mod helpers;

use chrono::Duration;

use helpers::{PASSWORD, TestApp};
use wot_auth::Argon2PasswordHasher;
use wot_core::error::ErrorKind;
use wot_core::traits::NotificationKind;
use wot_entity::role::RoleName;

#[tokio::test]
async fn test_register_verify_login_scenario() {
    let app = TestApp::new().await;
    let account = app.register("Pat", "Pat@Example.com").await;
    assert_eq!(account.credential.email, "pat@example.com");
    assert!(!account.credential.email_verified);

    let err = app
        .service()
        .login("pat@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "Email not verified.");

    let token = app
        .notifier
        .last_token("pat@example.com", NotificationKind::EmailVerification)
        .unwrap();
    let credential = app.service().verify_email(&token).await.unwrap();
    assert!(credential.email_verified);
    assert_eq!(
        app.notifier
            .count("pat@example.com", NotificationKind::Welcome),
        1
    );

    let first = app.login("pat@example.com").await;
    let second = app.login("PAT@example.com ").await;
    assert_eq!(first.user.id, account.user.id);
    assert_ne!(first.tokens.refresh_token, second.tokens.refresh_token);

    let claims = app
        .auth
        .codec
        .verify_access_token(&first.tokens.access_token)
        .unwrap();
    assert_eq!(claims.sub, account.user.id);
    assert_eq!(claims.public_id, account.user.public_id);
    assert_eq!(
        claims.roles,
        vec![RoleName::new("comments-user"), RoleName::new("reaction-user")]
    );
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;

    let wrong_password = app
        .service()
        .login("pat@example.com", "not-the-password")
        .await
        .unwrap_err();
    let unknown_email = app
        .service()
        .login("nobody@example.com", PASSWORD)
        .await
        .unwrap_err();

    assert_eq!(wrong_password.kind, ErrorKind::Unauthorized);
    assert_eq!(unknown_email.kind, ErrorKind::Unauthorized);
    assert_eq!(wrong_password.message, unknown_email.message);
}

#[tokio::test]
async fn test_unverified_account_hidden_behind_password_check() {
    let app = TestApp::new().await;
    app.register("Pat", "pat@example.com").await;

    let err = app
        .service()
        .login("pat@example.com", "not-the-password")
        .await
        .unwrap_err();
    assert_eq!(err.message, "Invalid credentials.");
}

#[tokio::test]
async fn test_duplicate_email_conflicts_case_insensitively() {
    let app = TestApp::new().await;
    app.register("Pat", "pat@example.com").await;

    let err = app
        .service()
        .register("Other Pat", "PAT@EXAMPLE.COM", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(err.message, "Email already in use.");
}

#[tokio::test]
async fn test_weak_password_creates_nothing() {
    let app = TestApp::new().await;

    let err = app
        .service()
        .register("Pat", "pat@example.com", "password1")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(app.notifier.sent().is_empty());

    // The email is still free.
    app.register("Pat", "pat@example.com").await;
}

#[tokio::test]
async fn test_malformed_email_creates_nothing() {
    let app = TestApp::new().await;

    for bad in ["pat@@example.com", "pat smith@example.com", "pat.example.com"] {
        let err = app
            .service()
            .register("Pat", bad, PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{bad} should be rejected");
    }
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_register_with_explicit_roles() {
    let app = TestApp::new().await;
    let account = app
        .service()
        .register_with_roles(
            "Moderator",
            "mod@example.com",
            PASSWORD,
            &[RoleName::new("comments-administrator")],
        )
        .await
        .unwrap();

    let permissions = app
        .auth
        .authorization
        .effective_permissions(account.user.id)
        .await
        .unwrap();
    assert_eq!(permissions.len(), 2);

    let err = app
        .service()
        .register_with_roles(
            "Ghost",
            "ghost@example.com",
            PASSWORD,
            &[RoleName::new("no-such-role")],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_resend_verification_supersedes_previous_token() {
    let app = TestApp::new().await;
    app.register("Pat", "pat@example.com").await;
    let first = app
        .notifier
        .last_token("pat@example.com", NotificationKind::EmailVerification)
        .unwrap();

    app.service()
        .resend_verification("pat@example.com")
        .await
        .unwrap();
    let second = app
        .notifier
        .last_token("pat@example.com", NotificationKind::EmailVerification)
        .unwrap();
    assert_ne!(first, second);

    let err = app.service().verify_email(&first).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    app.service().verify_email(&second).await.unwrap();

    let err = app
        .service()
        .resend_verification("pat@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = app
        .service()
        .resend_verification("nobody@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let app = TestApp::new().await;
    app.register("Pat", "pat@example.com").await;
    let token = app
        .notifier
        .last_token("pat@example.com", NotificationKind::EmailVerification)
        .unwrap();

    app.service().verify_email(&token).await.unwrap();
    let err = app.service().verify_email(&token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(
        app.notifier
            .count("pat@example.com", NotificationKind::Welcome),
        1
    );
}

#[tokio::test]
async fn test_verification_token_expires() {
    let app = TestApp::new().await;
    app.register("Pat", "pat@example.com").await;
    let token = app
        .notifier
        .last_token("pat@example.com", NotificationKind::EmailVerification)
        .unwrap();

    // Valid strictly before expires_at, expired at it.
    app.clock.advance(Duration::days(1));
    let err = app.service().verify_email(&token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Expired);

    let err = app
        .service()
        .login("pat@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.message, "Email not verified.");
}

#[tokio::test]
async fn test_concurrent_verification_applies_once() {
    let app = TestApp::new().await;
    app.register("Pat", "pat@example.com").await;
    let token = app
        .notifier
        .last_token("pat@example.com", NotificationKind::EmailVerification)
        .unwrap();

    let (a, b) = tokio::join!(
        app.service().verify_email(&token),
        app.service().verify_email(&token)
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
}

#[tokio::test]
async fn test_mail_failure_does_not_block_registration() {
    let app = TestApp::new().await;
    app.notifier.fail_deliveries(true);

    let account = app.register("Pat", "pat@example.com").await;
    assert_eq!(
        app.notifier
            .count("pat@example.com", NotificationKind::EmailVerification),
        1
    );

    // The token was issued even though delivery failed.
    app.notifier.fail_deliveries(false);
    let token = app
        .notifier
        .last_token("pat@example.com", NotificationKind::EmailVerification)
        .unwrap();
    let credential = app.service().verify_email(&token).await.unwrap();
    assert_eq!(credential.id, account.credential.id);
}

#[tokio::test]
async fn test_flow_with_argon2() {
    let app = TestApp::with_hasher(std::sync::Arc::new(Argon2PasswordHasher::new())).await;
    let account = app.register_verified("Pat", "pat@example.com").await;
    assert!(account.credential.password_hash.starts_with("$argon2id$"));

    let login = app.login("pat@example.com").await;
    assert_eq!(login.user.id, account.user.id);
}
