//! Admin API endpoints.
//!
//! All endpoints require the admin role.

use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;

use super::error::ApiError;
use crate::auth::{AdminOnly, Auth};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AdminState {
    pub jwt: Arc<JwtConfig>,
    pub limiter: Arc<RateLimiter>,
}

impl_has_auth_state!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/reset-rate-limit", post(reset_rate_limit))
        .with_state(state)
}

#[derive(Deserialize)]
struct ResetRateLimitRequest {
    ip: Option<String>,
}

/// Drop every rate-limit counter for one client IP.
async fn reset_rate_limit(
    State(state): State<AdminState>,
    _auth: Auth<AdminOnly>,
    Json(payload): Json<ResetRateLimitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ip = match payload.ip {
        Some(ip) if !ip.trim().is_empty() => ip,
        _ => return Err(ApiError::bad_request("IP address is required")),
    };

    let deleted = state
        .limiter
        .reset_for_ip(ip.trim())
        .await
        .map_err(|e| ApiError::internal("Failed to reset rate limit keys", e))?;

    Ok(Json(serde_json::json!({
        "message": format!("Reset {} rate limit keys for IP {}", deleted, ip.trim())
    })))
}
