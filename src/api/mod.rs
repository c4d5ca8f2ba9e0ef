mod admin;
mod auth;
mod error;
mod protected;

use std::sync::Arc;

use axum::{Router, middleware};

use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimiter, rate_limit};
use crate::service::AuthService;

/// Create the API router.
pub fn create_api_router(
    service: AuthService,
    jwt: Arc<JwtConfig>,
    limiter: Arc<RateLimiter>,
    secure_cookies: bool,
) -> Router {
    let auth_state = auth::AuthState {
        service,
        jwt: jwt.clone(),
        secure_cookies,
    };

    let protected_state = protected::ProtectedState { jwt: jwt.clone() };

    let admin_state = admin::AdminState {
        jwt,
        limiter: limiter.clone(),
    };

    // The per-IP limiter guards the credential endpoints; protected routes
    // are already gated by token verification.
    let auth_router = auth::router(auth_state)
        .layer(middleware::from_fn_with_state(limiter, rate_limit));

    Router::new()
        .nest("/auth", auth_router)
        .nest("/protected", protected::router(protected_state))
        .nest("/admin", admin::router(admin_state))
}
