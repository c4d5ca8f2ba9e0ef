#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use clipgate::{
    ServerConfig,
    cache::MemoryCache,
    create_app,
    db::Database,
    jwt::{JwtConfig, TokenLifetimes},
};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-0123456789abcdef";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

/// Create a test app backed by an in-memory database and cache. The rate
/// limit is set high so only the tests that target it trip it.
pub async fn test_app() -> TestApp {
    test_app_with_rate_limit(10_000).await
}

pub async fn test_app_with_rate_limit(per_minute: u32) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let lifetimes = TokenLifetimes::default();
    let config = ServerConfig {
        db: db.clone(),
        cache: Arc::new(MemoryCache::new()),
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        token_lifetimes: lifetimes,
        secure_cookies: false,
        rate_limit_per_minute: per_minute,
    };
    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(TEST_JWT_SECRET, lifetimes),
    }
}

/// POST a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    path: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// POST a JSON body with extra headers (e.g. Authorization, Cookie).
pub async fn post_json_with_headers(
    app: &Router,
    path: &str,
    body: serde_json::Value,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// POST with no body, with headers.
pub async fn post_with_headers(
    app: &Router,
    path: &str,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method("POST").uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// GET with headers.
pub async fn get_with_headers(
    app: &Router,
    path: &str,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pull the refresh token value out of the response's Set-Cookie headers.
pub fn refresh_cookie_value(response: &Response<Body>) -> Option<String> {
    for value in response.headers().get_all(header::SET_COOKIE) {
        let value = value.to_str().ok()?;
        if let Some(rest) = value.strip_prefix("refresh_token=") {
            let token = rest.split(';').next().unwrap_or("").trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Register a user and return (access_token, refresh_token).
pub async fn register_user(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> (String, String) {
    let response = post_json(
        app,
        "/auth/register",
        serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
            "role": role,
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    let refresh = refresh_cookie_value(&response).expect("refresh cookie");
    let body = body_json(response).await;
    let access = body["access_token"].as_str().expect("access token").to_string();
    (access, refresh)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Issue an access token directly (bypassing registration) for guard tests.
pub fn access_token_for(jwt: &JwtConfig, username: &str, role: clipgate::db::UserRole) -> String {
    jwt.issue_access_token(username, role).unwrap()
}
