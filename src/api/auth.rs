//! Authentication API endpoints.
//!
//! - POST `/register` - Create an account, returns tokens
//! - POST `/login` - Exchange credentials for tokens
//! - POST `/refresh` - Rotate the refresh token, mint a new access token
//! - GET `/me` - Current account details
//! - POST `/logout` - Clear the refresh cookie

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::auth::{
    Auth, REFRESH_COOKIE_NAME, bearer_token, clear_refresh_cookie, get_cookie, refresh_cookie,
};
use crate::db::{User, UserRole};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::service::{AuthError, AuthService, TokenPair};

#[derive(Clone)]
pub struct AuthState {
    pub service: AuthService,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(AuthState);

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Public account fields. The password hash never appears in a response.
#[derive(Serialize)]
struct UserResponse {
    username: String,
    email: String,
    role: UserRole,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    user: UserResponse,
}

impl AuthState {
    /// 200/201 body with the access token, plus the refresh-token cookie.
    fn token_response(
        &self,
        status: StatusCode,
        user: User,
        tokens: TokenPair,
    ) -> impl IntoResponse + use<> {
        let cookie = refresh_cookie(
            &tokens.refresh_token,
            self.jwt.refresh_ttl(),
            self.secure_cookies,
        );
        (
            status,
            AppendHeaders([(SET_COOKIE, cookie)]),
            Json(TokenResponse {
                access_token: tokens.access_token,
                user: user.into(),
            }),
        )
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = required(payload.username, "username")?;
    let email = required(payload.email, "email")?;
    let password = required(payload.password, "password")?;
    let role = payload
        .role
        .as_deref()
        .map(UserRole::from_str)
        .unwrap_or(UserRole::User);

    let (user, tokens) = state
        .service
        .register(&username, &email, &password, role)
        .await?;

    Ok(state.token_response(StatusCode::CREATED, user, tokens))
}

#[derive(Deserialize)]
struct LoginRequest {
    identifier: Option<String>,
    password: Option<String>,
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = required(payload.identifier, "identifier")?;
    let password = required(payload.password, "password")?;

    let (user, tokens) = state.service.login(&identifier, &password).await?;

    Ok(state.token_response(StatusCode::OK, user, tokens))
}

/// Rotate the refresh token. Accepts the token from the refresh cookie or a
/// bearer header. The role in the new access token comes from the store,
/// not from the old token.
async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?
        .to_string();

    let (user, tokens) = state.service.refresh(&token).await.map_err(|e| match e {
        // A refresh token for a vanished account reads as a failed refresh,
        // not as a resource lookup.
        AuthError::UserNotFound => ApiError::unauthorized("User not found"),
        e => ApiError::from(e),
    })?;

    Ok(state.token_response(StatusCode::OK, user, tokens))
}

async fn me(State(state): State<AuthState>, auth: Auth) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.fetch_user(&auth.claims.sub).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Clear the refresh cookie. Tokens are stateless, so there is nothing to
/// revoke server-side; logging out is forgetting the cookie. Idempotent.
async fn logout(State(state): State<AuthState>) -> impl IntoResponse {
    let cookie = clear_refresh_cookie(state.secure_cookies);
    (
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("{} is required", field))),
    }
}
