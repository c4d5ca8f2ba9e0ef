pub mod api;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod credentials;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod throttle;
pub mod validate;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use cache::Cache;
use credentials::CredentialStore;
use db::Database;
use jwt::{JwtConfig, TokenLifetimes};
use rate_limit::RateLimiter;
use service::AuthService;
use throttle::LoginThrottle;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Shared key-value store for counters and cached lookups
    pub cache: Arc<dyn Cache>,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Access and refresh token lifetimes
    pub token_lifetimes: TokenLifetimes,
    /// Whether to set Secure flag on cookies (true in production with HTTPS)
    pub secure_cookies: bool,
    /// Requests per minute allowed per client IP on the auth endpoints
    pub rate_limit_per_minute: u32,
}

/// Create the application router with the given configuration.
/// Every service object is constructed here once and handed to the routers
/// by reference; there is no global state.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret, config.token_lifetimes));

    let credentials = CredentialStore::new(config.db.users(), config.cache.clone());
    let throttle = LoginThrottle::new(config.cache.clone());
    let service = AuthService::new(credentials, throttle, jwt.clone());
    let limiter = Arc::new(RateLimiter::new(
        config.cache.clone(),
        config.rate_limit_per_minute,
    ));

    api::create_api_router(service, jwt, limiter, config.secure_cookies)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
