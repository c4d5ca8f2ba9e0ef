//! Login-attempt throttling.
//!
//! A per-identifier counter in the shared key-value store. The window is
//! fixed from the first attempt; the counter disappears on its own when the
//! window ends, or immediately on a successful login. If the store is
//! unreachable, attempts count as zero and authentication proceeds
//! un-throttled rather than locking everyone out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::cache::Cache;

/// Failed attempts allowed per window; the next one is rejected.
pub const MAX_LOGIN_ATTEMPTS: i64 = 5;

/// How long an attempt counter lives, measured from the first attempt.
pub const ATTEMPT_WINDOW: Duration = Duration::from_secs(3600);

fn attempt_key(identifier: &str) -> String {
    format!("login_attempts:{}", identifier)
}

#[derive(Clone)]
pub struct LoginThrottle {
    cache: Arc<dyn Cache>,
}

impl LoginThrottle {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Record one login attempt for `identifier` and return the attempt
    /// count inside the current window. Store faults return 0.
    pub async fn increment(&self, identifier: &str) -> i64 {
        match self.cache.incr(&attempt_key(identifier), ATTEMPT_WINDOW).await {
            Ok(count) => count,
            Err(e) => {
                error!(identifier = %identifier, error = %e,
                    "Failed to increment login attempts, proceeding un-throttled");
                0
            }
        }
    }

    /// Whether an attempt count is over the limit. The boundary sits after
    /// `MAX_LOGIN_ATTEMPTS`: the 6th attempt is the first rejected one.
    pub fn is_exceeded(&self, attempts: i64) -> bool {
        attempts > MAX_LOGIN_ATTEMPTS
    }

    /// Drop the counter for `identifier`. No-op if absent.
    pub async fn reset(&self, identifier: &str) {
        if let Err(e) = self.cache.delete(&attempt_key(identifier)).await {
            warn!(identifier = %identifier, error = %e, "Failed to reset login attempts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache};

    #[tokio::test]
    async fn test_counts_attempts_per_identifier() {
        let throttle = LoginThrottle::new(Arc::new(MemoryCache::new()));

        assert_eq!(throttle.increment("alice").await, 1);
        assert_eq!(throttle.increment("alice").await, 2);
        assert_eq!(throttle.increment("bob").await, 1);
    }

    #[tokio::test]
    async fn test_sixth_attempt_is_first_rejected() {
        let throttle = LoginThrottle::new(Arc::new(MemoryCache::new()));

        for _ in 0..MAX_LOGIN_ATTEMPTS {
            let attempts = throttle.increment("alice").await;
            assert!(!throttle.is_exceeded(attempts));
        }
        let sixth = throttle.increment("alice").await;
        assert!(throttle.is_exceeded(sixth));
    }

    #[tokio::test]
    async fn test_reset_clears_the_counter() {
        let throttle = LoginThrottle::new(Arc::new(MemoryCache::new()));

        for _ in 0..6 {
            throttle.increment("alice").await;
        }
        throttle.reset("alice").await;
        assert_eq!(throttle.increment("alice").await, 1);
    }

    #[tokio::test]
    async fn test_reset_of_absent_counter_is_a_noop() {
        let throttle = LoginThrottle::new(Arc::new(MemoryCache::new()));
        throttle.reset("nobody").await;
        assert_eq!(throttle.increment("nobody").await, 1);
    }

    /// Cache stub whose operations always fail.
    struct DownCache;

    #[async_trait::async_trait]
    impl Cache for DownCache {
        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::new("connection refused"))
        }
        async fn set(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::new("connection refused"))
        }
        async fn delete(&self, _: &str) -> Result<bool, CacheError> {
            Err(CacheError::new("connection refused"))
        }
        async fn incr(&self, _: &str, _: Duration) -> Result<i64, CacheError> {
            Err(CacheError::new("connection refused"))
        }
        async fn delete_prefix(&self, _: &str) -> Result<u64, CacheError> {
            Err(CacheError::new("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_store_outage_fails_open() {
        let throttle = LoginThrottle::new(Arc::new(DownCache));

        let attempts = throttle.increment("alice").await;
        assert_eq!(attempts, 0);
        assert!(!throttle.is_exceeded(attempts));

        // Reset must also swallow the fault.
        throttle.reset("alice").await;
    }
}
