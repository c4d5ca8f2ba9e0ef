use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use clipgate::cli::{Args, connect_cache, init_logging, load_jwt_secret, open_database};
use clipgate::jwt::TokenLifetimes;
use clipgate::{ServerConfig, create_app};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let cache = connect_cache(args.cache_url.as_deref()).await;

    let config = ServerConfig {
        db,
        cache,
        jwt_secret: jwt_secret.into_bytes(),
        token_lifetimes: TokenLifetimes {
            access: Duration::from_secs(args.access_token_ttl),
            refresh: Duration::from_secs(args.refresh_token_ttl),
        },
        secure_cookies: args.secure_cookies,
        rate_limit_per_minute: args.rate_limit_per_minute,
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();
    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
