//! Credential store: user records with a read-through lookup cache.
//!
//! Lookups by identifier are cached in the shared key-value store for a
//! short TTL. Creating a user invalidates the new username and email keys
//! before returning, so a lookup immediately after registration never sees
//! a stale answer. Cache faults degrade to direct database reads.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cache::Cache;
use crate::db::{User, UserRole, UserStore};

/// How long a cached user lookup stays valid.
pub const LOOKUP_TTL: Duration = Duration::from_secs(300);

fn lookup_key(identifier: &str) -> String {
    format!("user:{}", identifier)
}

#[derive(Clone)]
pub struct CredentialStore {
    users: UserStore,
    cache: Arc<dyn Cache>,
}

/// Error creating or fetching a user record.
#[derive(Debug)]
pub enum CredentialError {
    /// The unique index on username or email rejected the insert.
    UsernameOrEmailTaken,
    /// Any other database failure.
    Db(sqlx::Error),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::UsernameOrEmailTaken => write!(f, "Username or email already exists"),
            CredentialError::Db(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for CredentialError {}

impl From<sqlx::Error> for CredentialError {
    fn from(e: sqlx::Error) -> Self {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            CredentialError::UsernameOrEmailTaken
        } else {
            CredentialError::Db(e)
        }
    }
}

impl CredentialStore {
    pub fn new(users: UserStore, cache: Arc<dyn Cache>) -> Self {
        Self { users, cache }
    }

    /// Create a user and invalidate any cached lookups under the new
    /// username or email. Invalidation completes before this returns.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, CredentialError> {
        let user = self
            .users
            .create(username, email, password_hash, role)
            .await?;

        self.invalidate(username).await;
        self.invalidate(email).await;

        Ok(user)
    }

    /// Look up a user by username or email, serving from the cache when a
    /// fresh entry exists.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, sqlx::Error> {
        let key = lookup_key(identifier);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => match serde_json::from_str::<User>(&cached) {
                Ok(user) => return Ok(Some(user)),
                Err(e) => warn!(key = %key, error = %e, "Discarding undecodable cache entry"),
            },
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, falling back to database"),
        }

        let user = self.users.get_by_identifier(identifier).await?;
        if let Some(ref user) = user {
            self.store_cached(&key, user).await;
        }
        Ok(user)
    }

    /// Look up a user by username straight from the database, bypassing the
    /// cache. Token refresh uses this so a role change is visible at once
    /// rather than after the cache TTL. The fresh record replaces any cached
    /// entry.
    pub async fn find_fresh_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let user = self.users.get_by_username(username).await?;
        if let Some(ref user) = user {
            self.store_cached(&lookup_key(username), user).await;
        }
        Ok(user)
    }

    async fn store_cached(&self, key: &str, user: &User) {
        match serde_json::to_string(user) {
            Ok(json) => {
                if let Err(e) = self.cache.set(key, &json, LOOKUP_TTL).await {
                    warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to encode user for cache"),
        }
    }

    async fn invalidate(&self, identifier: &str) {
        let key = lookup_key(identifier);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }
}
