//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use url::Url;

use crate::cache::{Cache, MemoryCache, RedisCache};
use crate::db::Database;
use crate::jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "clipgate",
    about = "JWT-authenticated account backend for a media download service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "clipgate.db", env = "DATABASE_PATH")]
    pub database: String,

    /// Redis URL for login counters, rate limits, and cached lookups.
    /// Without it (or if the connection fails) an in-process store is used.
    #[arg(long, env = "REDIS_URL", value_parser = validate_cache_url)]
    pub cache_url: Option<String>,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TTL_SECS, env = "ACCESS_TOKEN_TTL")]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_TTL_SECS, env = "REFRESH_TOKEN_TTL")]
    pub refresh_token_ttl: u64,

    /// Requests per minute allowed per client IP on the auth endpoints
    #[arg(long, default_value = "10", env = "RATE_LIMIT_PER_MINUTE")]
    pub rate_limit_per_minute: u32,

    /// Set the Secure flag on auth cookies (HTTPS deployments)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_cache_url(s: &str) -> Result<String, String> {
    let url = Url::parse(s).map_err(|e| format!("Invalid cache URL: {}", e))?;
    match url.scheme() {
        "redis" | "rediss" => Ok(s.to_string()),
        scheme => Err(format!("Cache URL must use redis:// or rediss://, got {}", scheme)),
    }
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Connect the key-value store. A missing URL or a failed connection falls
/// back to the in-process store so throttling and rate limiting keep working
/// within this instance. The URL itself is never logged; it may embed
/// credentials.
pub async fn connect_cache(url: Option<&str>) -> Arc<dyn Cache> {
    match url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => {
                info!("Connected to Redis cache");
                Arc::new(cache)
            }
            Err(e) => {
                error!(error = %e, "Redis connection failed, falling back to in-process cache");
                Arc::new(MemoryCache::new())
            }
        },
        None => {
            warn!("No cache URL configured, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}
