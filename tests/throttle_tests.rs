//! End-to-end login throttling: five failures are reported as bad
//! credentials, the sixth attempt in the window is rejected outright, and a
//! successful login resets the counter.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

async fn failed_login(ctx: &TestApp, identifier: &str) -> StatusCode {
    post_json(
        &ctx.app,
        "/auth/login",
        json!({"identifier": identifier, "password": "WrongPw99"}),
    )
    .await
    .status()
}

#[tokio::test]
async fn test_sixth_attempt_in_window_is_throttled() {
    let ctx = test_app().await;

    register_user(&ctx.app, "alice", "a@x.com", "Passw0rd1", "user").await;

    for _ in 0..5 {
        assert_eq!(failed_login(&ctx, "alice").await, StatusCode::UNAUTHORIZED);
    }

    // The sixth attempt is rejected before credentials are even checked:
    // the correct password gets 429 too.
    let response = post_json(
        &ctx.app,
        "/auth/login",
        json!({"identifier": "alice", "password": "Passw0rd1"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Too many login attempts"));
}

#[tokio::test]
async fn test_successful_login_resets_the_counter() {
    let ctx = test_app().await;

    register_user(&ctx.app, "alice", "a@x.com", "Passw0rd1", "user").await;

    for _ in 0..3 {
        assert_eq!(failed_login(&ctx, "alice").await, StatusCode::UNAUTHORIZED);
    }

    // Success within the window resets the counter...
    let response = post_json(
        &ctx.app,
        "/auth/login",
        json!({"identifier": "alice", "password": "Passw0rd1"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // ...so five more failures are reported as 401 before the throttle
    // trips again.
    for _ in 0..5 {
        assert_eq!(failed_login(&ctx, "alice").await, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(failed_login(&ctx, "alice").await, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_throttle_is_per_identifier() {
    let ctx = test_app().await;

    register_user(&ctx.app, "alice", "a@x.com", "Passw0rd1", "user").await;
    register_user(&ctx.app, "bob", "b@x.com", "Passw0rd1", "user").await;

    for _ in 0..6 {
        failed_login(&ctx, "alice").await;
    }
    assert_eq!(failed_login(&ctx, "alice").await, StatusCode::TOO_MANY_REQUESTS);

    // Bob is unaffected.
    assert_eq!(failed_login(&ctx, "bob").await, StatusCode::UNAUTHORIZED);
    let response = post_json(
        &ctx.app,
        "/auth/login",
        json!({"identifier": "bob", "password": "Passw0rd1"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_identifiers_are_throttled_too() {
    let ctx = test_app().await;

    for _ in 0..5 {
        assert_eq!(failed_login(&ctx, "nobody").await, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(failed_login(&ctx, "nobody").await, StatusCode::TOO_MANY_REQUESTS);
}
