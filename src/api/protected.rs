//! Role-gated demonstration endpoints.

use std::sync::Arc;

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::auth::{AdminOnly, Auth};
use crate::db::UserRole;
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct ProtectedState {
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_state!(ProtectedState);

pub fn router(state: ProtectedState) -> Router {
    Router::new()
        .route("/resource", get(resource))
        .route("/admin", get(admin))
        .with_state(state)
}

#[derive(Serialize)]
struct ResourceResponse {
    user: String,
    role: UserRole,
    message: &'static str,
}

/// Any valid access token gets through.
async fn resource(auth: Auth) -> impl IntoResponse {
    Json(ResourceResponse {
        user: auth.claims.sub,
        role: auth.claims.role,
        message: "Access granted",
    })
}

/// Admin role required on top of a valid token.
async fn admin(_auth: Auth<AdminOnly>) -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Admin access granted" }))
}
