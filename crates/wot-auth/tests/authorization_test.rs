//! Integration tests for request authorization.

mod helpers;

use helpers::TestApp;
use wot_core::error::ErrorKind;
use wot_entity::role::{PermissionName, RoleName};

fn perms(names: &[&str]) -> Vec<PermissionName> {
    names.iter().map(|n| PermissionName::new(*n)).collect()
}

#[tokio::test]
async fn test_any_listed_permission_grants_access() {
    let app = TestApp::new().await;
    app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;

    let claims = app
        .service()
        .authorize_request(
            &login.tokens.access_token,
            &perms(&["delete-comments", "create-reactions"]),
        )
        .await
        .unwrap();
    assert_eq!(claims.sub, login.user.id);

    let err = app
        .service()
        .authorize_request(&login.tokens.access_token, &perms(&["delete-comments"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_permissions_are_read_live_not_from_token() {
    let app = TestApp::new().await;
    let account = app.register_verified("Pat", "pat@example.com").await;
    let login = app.login("pat@example.com").await;
    let delete = perms(&["delete-comments"]);

    app.store
        .assign_role(account.user.id, "comments-administrator")
        .await
        .unwrap();

    // The token still carries the old snapshot, the decision does not.
    let claims = app
        .service()
        .authorize_request(&login.tokens.access_token, &delete)
        .await
        .unwrap();
    assert!(!claims.roles.contains(&RoleName::new("comments-administrator")));

    app.store
        .unassign_role(account.user.id, "comments-user")
        .await;
    let err = app
        .service()
        .authorize_request(&login.tokens.access_token, &perms(&["create-comments"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_bad_access_token_is_unauthorized() {
    let app = TestApp::new().await;
    let err = app
        .service()
        .authorize_request("garbage", &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_all_of_check() {
    let app = TestApp::new().await;
    let account = app.register_verified("Pat", "pat@example.com").await;
    let evaluator = &app.auth.authorization;

    assert!(
        evaluator
            .authorize_all(
                account.user.id,
                &perms(&["create-comments", "create-reactions"])
            )
            .await
            .unwrap()
    );
    assert!(
        !evaluator
            .authorize_all(
                account.user.id,
                &perms(&["create-comments", "delete-comments"])
            )
            .await
            .unwrap()
    );
}
