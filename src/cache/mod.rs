//! Shared key-value store with TTLs and atomic counters.
//!
//! Backs the login-attempt throttle, the user lookup cache, and the per-IP
//! rate limiter. Two implementations: [`RedisCache`] for deployments and
//! [`MemoryCache`] for tests and as the startup fallback when no cache URL
//! is configured or the connection fails.

mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Key-value store operations used by the auth stack.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get the value stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` with the given time-to-live.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Delete `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Atomically increment the counter under `key` and return the new value.
    /// A key created by this call gets `ttl`; an existing key keeps its
    /// remaining TTL, so the window is fixed from the first increment.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;

    /// Delete every key starting with `prefix`. Returns the number deleted.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

/// Error talking to the backing store.
#[derive(Debug)]
pub struct CacheError(String);

impl CacheError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cache error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

impl From<::redis::RedisError> for CacheError {
    fn from(e: ::redis::RedisError) -> Self {
        Self(e.to_string())
    }
}
