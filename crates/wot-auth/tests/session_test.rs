//! Integration tests for refresh rotation and session revocation.

mod helpers;

use chrono::{DateTime, Duration, Utc};

use helpers::TestApp;
use wot_auth::TokenLookup;
use wot_core::error::ErrorKind;
use wot_core::types::Ttl;
use wot_entity::role::RoleName;
use wot_entity::token::TokenKind;

#[tokio::test]
async fn test_rotation_replaces_presented_token() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    let rotated = app
        .service()
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, login.tokens.refresh_token);

    let err = app
        .service()
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    app.service().refresh(&rotated.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_failed_signing_leaves_refresh_token_usable() {
    let mut config = helpers::auth_config();
    config.access_token_ttl = Ttl::days(30);
    config.refresh_token_ttl = Ttl::days(1);
    let app = TestApp::with_config(config).await;
    let account = app.register_verified("Pat", "pat@example.com").await;

    // Close enough to the end of time that a 30 day access token cannot be dated.
    app.clock.set(DateTime::<Utc>::MAX_UTC - Duration::days(20));
    let session = app
        .auth
        .sessions
        .create_session(account.user.id)
        .await
        .unwrap();

    let err = app.service().refresh(&session.value).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);

    let lookup = app
        .auth
        .store
        .lookup(&session.value, TokenKind::Refresh)
        .await
        .unwrap();
    assert!(matches!(lookup, TokenLookup::Valid(_)));
}

#[tokio::test]
async fn test_concurrent_rotation_has_one_winner() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    let (a, b) = tokio::join!(
        app.service().refresh(&login.tokens.refresh_token),
        app.service().refresh(&login.tokens.refresh_token)
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = a.as_ref().err().or(b.as_ref().err()).unwrap();
    assert_eq!(loser.kind, ErrorKind::Unauthorized);

    let live = app
        .store
        .tokens_for_owner(login.user.id.into_uuid(), TokenKind::Refresh)
        .await
        .into_iter()
        .filter(|t| t.invalidated_at.is_none())
        .count();
    assert_eq!(live, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_rotation_across_threads() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = app.auth.service.clone();
        let token = login.tokens.refresh_token.clone();
        handles.push(tokio::spawn(async move { service.refresh(&token).await }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let phone = app.login("pat@example.com").await;
    let laptop = app.login("pat@example.com").await;

    app.service()
        .logout(&phone.tokens.refresh_token)
        .await
        .unwrap();

    assert!(app.service().refresh(&phone.tokens.refresh_token).await.is_err());
    app.service()
        .refresh(&laptop.tokens.refresh_token)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_refresh_picks_up_role_changes() {
    let app = TestApp::new().await;
    let account = app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    app.store
        .assign_role(account.user.id, "comments-administrator")
        .await
        .unwrap();

    let rotated = app
        .service()
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap();
    let claims = app
        .auth
        .codec
        .verify_access_token(&rotated.access_token)
        .unwrap();
    assert!(
        claims
            .roles
            .contains(&RoleName::new("comments-administrator"))
    );
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    app.service()
        .logout(&login.tokens.refresh_token)
        .await
        .unwrap();
    app.service()
        .logout(&login.tokens.refresh_token)
        .await
        .unwrap();

    let err = app.service().logout("never-issued").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_logout_all_ends_every_device() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    app.register_verified("Sam", "sam@example.com").await;

    let devices = [
        app.login("pat@example.com").await,
        app.login("pat@example.com").await,
        app.login("pat@example.com").await,
    ];
    let other = app.login("sam@example.com").await;

    let revoked = app
        .service()
        .logout_all(&devices[1].tokens.refresh_token)
        .await
        .unwrap();
    assert_eq!(revoked, 3);

    for device in &devices {
        let err = app
            .service()
            .refresh(&device.tokens.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
    app.service()
        .refresh(&other.tokens.refresh_token)
        .await
        .unwrap();

    let err = app
        .service()
        .logout_all(&devices[0].tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_refresh_token_expires_at_boundary() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    app.clock.advance(Duration::days(7) - Duration::seconds(1));
    let rotated = app
        .service()
        .refresh(&login.tokens.refresh_token)
        .await
        .unwrap();

    // The replacement lives a full lifetime from its own issuance.
    app.clock.advance(Duration::days(7));
    let err = app
        .service()
        .refresh(&rotated.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_access_token_expiry_uses_injected_clock() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    app.service()
        .authenticate(&login.tokens.access_token)
        .unwrap();

    app.clock.advance(Duration::minutes(16));
    let err = app
        .service()
        .authenticate(&login.tokens.access_token)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}
