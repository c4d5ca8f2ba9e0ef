//! Guard rejection types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::JwtError;

/// Why a guarded request was turned away.
#[derive(Debug)]
pub enum AuthRejection {
    /// No bearer token on the request.
    MissingToken,
    /// A token was presented but failed verification; the category drives
    /// the client-facing message.
    Invalid(JwtError),
    /// Authenticated, but the role claim does not meet the requirement.
    InsufficientRole { required: &'static str },
}

impl AuthRejection {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthRejection::MissingToken | AuthRejection::Invalid(_) => StatusCode::UNAUTHORIZED,
            AuthRejection::InsufficientRole { .. } => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> String {
        match self {
            AuthRejection::MissingToken => "Missing authentication token".to_string(),
            AuthRejection::Invalid(e) => e.to_string(),
            AuthRejection::InsufficientRole { required } => {
                format!("Role '{}' required", required)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                message: self.message(),
            }),
        )
            .into_response()
    }
}
