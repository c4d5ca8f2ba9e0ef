//! Account registration and authentication.
//!
//! Orchestrates validation, the attempt throttle, credential verification,
//! and token issuance. Within one authentication the throttle increment
//! happens before the credential lookup, so a store outage or a verify
//! failure cannot bypass throttling. Password work runs on the blocking
//! thread pool.

use std::sync::Arc;

use tracing::info;

use crate::credentials::{CredentialError, CredentialStore};
use crate::db::{User, UserRole};
use crate::jwt::{JwtConfig, JwtError};
use crate::password;
use crate::throttle::LoginThrottle;
use crate::validate::{ValidationError, validate_email, validate_password, validate_username};

/// Freshly issued access/refresh tokens. Never persisted.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialStore,
    throttle: LoginThrottle,
    jwt: Arc<JwtConfig>,
}

/// Errors raised at the service boundary; the API layer translates these
/// into status codes and JSON messages.
#[derive(Debug)]
pub enum AuthError {
    /// Registration input failed validation.
    Validation(ValidationError),
    /// Username or email collided with an existing account.
    UsernameOrEmailTaken,
    /// No user/password match. Deliberately covers both "no such user" and
    /// "wrong password" so responses do not enumerate accounts.
    InvalidCredentials,
    /// The attempt counter for this identifier is over the limit.
    TooManyAttempts,
    /// The referenced account does not exist.
    UserNotFound,
    /// A presented token failed verification.
    InvalidToken(JwtError),
    /// Infrastructure failure; detail is logged, never sent to clients.
    Internal(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Validation(e) => write!(f, "{}", e),
            AuthError::UsernameOrEmailTaken => write!(f, "Username or email already exists"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::TooManyAttempts => {
                write!(f, "Too many login attempts, please try again later")
            }
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::InvalidToken(e) => write!(f, "{}", e),
            AuthError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ValidationError> for AuthError {
    fn from(e: ValidationError) -> Self {
        AuthError::Validation(e)
    }
}

impl From<CredentialError> for AuthError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::UsernameOrEmailTaken => AuthError::UsernameOrEmailTaken,
            CredentialError::Db(e) => AuthError::Internal(format!("Database error: {}", e)),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Internal(format!("Database error: {}", e))
    }
}

impl AuthService {
    pub fn new(credentials: CredentialStore, throttle: LoginThrottle, jwt: Arc<JwtConfig>) -> Self {
        Self {
            credentials,
            throttle,
            jwt,
        }
    }

    /// Register a new account and log it in.
    ///
    /// Validates username, email, and password in that order, failing on the
    /// first violation. The password is hashed before storage; the raw value
    /// is dropped here and never logged.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<(User, TokenPair), AuthError> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(|e| AuthError::Internal(format!("Hashing failed: {}", e)))?;

        let user = self
            .credentials
            .create(username, email, &password_hash, role)
            .await?;

        info!(username = %user.username, role = %user.role.as_str(), "Registered user");

        let tokens = self.issue_tokens(&user)?;
        Ok((user, tokens))
    }

    /// Verify an identifier/password pair.
    ///
    /// Every call counts against the attempt window, successful or not, and
    /// the count is checked before any credential work. A match resets the
    /// counter.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let attempts = self.throttle.increment(identifier).await;
        if self.throttle.is_exceeded(attempts) {
            info!(identifier = %identifier, attempts, "Login throttled");
            return Err(AuthError::TooManyAttempts);
        }

        let user = self.credentials.find_by_identifier(identifier).await?;

        let Some(user) = user else {
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let digest = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || password::verify_password(&password, &digest))
                .await
                .map_err(|e| AuthError::Internal(format!("Verify task failed: {}", e)))?;

        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        self.throttle.reset(identifier).await;
        Ok(user)
    }

    /// Authenticate and issue a fresh token pair.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let user = self.authenticate(identifier, password).await?;
        info!(username = %user.username, "Logged in");
        let tokens = self.issue_tokens(&user)?;
        Ok((user, tokens))
    }

    /// Redeem a refresh token for a new token pair (refresh token rotation).
    ///
    /// The role is not trusted from the old token: the user is re-read from
    /// the store, bypassing the lookup cache, so a role change is reflected
    /// in the new access token immediately.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AuthError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(AuthError::InvalidToken)?;

        let user = self
            .credentials
            .find_fresh_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let tokens = self.issue_tokens(&user)?;
        Ok((user, tokens))
    }

    /// Fetch the account behind a verified access token (for /auth/me).
    pub async fn fetch_user(&self, username: &str) -> Result<User, AuthError> {
        self.credentials
            .find_by_identifier(username)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Mint an access/refresh pair for a user.
    pub fn issue_tokens(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = self
            .jwt
            .issue_access_token(&user.username, user.role)
            .map_err(|e| AuthError::Internal(format!("Failed to issue access token: {}", e)))?;
        let refresh_token = self
            .jwt
            .issue_refresh_token(&user.username)
            .map_err(|e| AuthError::Internal(format!("Failed to issue refresh token: {}", e)))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
