//! Axum extractors for authentication and role checks.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::bearer_token;
use super::errors::AuthRejection;
use super::state::HasAuthState;
use crate::db::UserRole;
use crate::jwt::AccessClaims;

/// A role requirement checked after token verification.
pub trait RoleConstraint {
    fn check(claims: &AccessClaims) -> Result<(), AuthRejection>;
}

/// Any authenticated caller.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn check(_claims: &AccessClaims) -> Result<(), AuthRejection> {
        Ok(())
    }
}

/// Callers whose role claim is `admin`.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn check(claims: &AccessClaims) -> Result<(), AuthRejection> {
        if claims.role == UserRole::Admin {
            Ok(())
        } else {
            Err(AuthRejection::InsufficientRole { required: "admin" })
        }
    }
}

/// Extractor guarding a handler: verifies the bearer access token, then the
/// role constraint, and exposes the verified claims. A token without a role
/// claim fails deserialization inside validation and is rejected as
/// malformed (401) before the role check runs.
pub struct Auth<C: RoleConstraint = AnyRole> {
    pub claims: AccessClaims,
    _role: PhantomData<fn() -> C>,
}

impl<S, C> FromRequestParts<S> for Auth<C>
where
    S: HasAuthState + Send + Sync,
    C: RoleConstraint,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthRejection::MissingToken)?;

        let claims = state
            .jwt()
            .validate_access_token(token)
            .map_err(AuthRejection::Invalid)?;

        C::check(&claims)?;

        Ok(Auth {
            claims,
            _role: PhantomData,
        })
    }
}
