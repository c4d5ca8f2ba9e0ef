//! Per-IP request rate limiting for the auth endpoints.
//!
//! Fixed one-minute windows counted in the shared key-value store, so the
//! limit holds across instances sharing a Redis backend. Keys follow
//! `rate_limit:<ip>:<window>`; the admin reset endpoint clears every window
//! for one IP. Store faults fail open.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::cache::Cache;

const WINDOW: Duration = Duration::from_secs(60);

fn window_key(ip: &str, window: u64) -> String {
    format!("rate_limit:{}:{}", ip, window)
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    per_minute: u32,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn Cache>, per_minute: u32) -> Self {
        Self { cache, per_minute }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Count one request from `ip` and report whether it is within the
    /// limit. A store fault counts as allowed.
    pub async fn allow(&self, ip: &str) -> bool {
        let window = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() / WINDOW.as_secs())
            .unwrap_or(0);

        match self.cache.incr(&window_key(ip, window), WINDOW).await {
            Ok(count) => count <= i64::from(self.per_minute),
            Err(e) => {
                warn!(ip = %ip, error = %e, "Rate limit store failed, allowing request");
                true
            }
        }
    }

    /// Delete every rate-limit window for `ip`. Returns the number of keys
    /// removed.
    pub async fn reset_for_ip(&self, ip: &str) -> Result<u64, crate::cache::CacheError> {
        self.cache.delete_prefix(&format!("rate_limit:{}:", ip)).await
    }
}

/// Middleware limiting requests per client IP.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    if limiter.allow(&ip).await {
        next.run(request).await
    } else {
        #[derive(serde::Serialize)]
        struct ErrorResponse {
            message: String,
        }

        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                message: format!(
                    "Too many requests, limit is {} per minute",
                    limiter.per_minute()
                ),
            }),
        )
            .into_response()
    }
}

/// Client IP for rate-limit bookkeeping: the first X-Forwarded-For entry
/// when running behind a proxy, otherwise the socket address.
pub fn client_ip(request: &Request) -> String {
    if let Some(forwarded_for) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return ip.to_string();
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn test_limit_applies_per_ip() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::new()), 3);

        for _ in 0..3 {
            assert!(limiter.allow("1.2.3.4").await);
        }
        assert!(!limiter.allow("1.2.3.4").await);

        // A different IP has its own budget.
        assert!(limiter.allow("5.6.7.8").await);
    }

    #[tokio::test]
    async fn test_reset_clears_all_windows_for_ip() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::new()), 2);

        while limiter.allow("1.2.3.4").await {}
        let deleted = limiter.reset_for_ip("1.2.3.4").await.unwrap();
        assert!(deleted >= 1);
        assert!(limiter.allow("1.2.3.4").await);
    }

    #[tokio::test]
    async fn test_reset_unknown_ip_deletes_nothing() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::new()), 2);
        assert_eq!(limiter.reset_for_ip("9.9.9.9").await.unwrap(), 0);
    }
}
