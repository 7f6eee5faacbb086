pub mod api;
pub mod auth;
pub mod authority;
pub mod cleanup;
pub mod cli;
pub mod client;
pub mod db;
pub mod rate_limit;

use api::{CorsConfig, create_api_router};
use authority::{AuthoritySettings, TokenAuthority};
use axum::Router;
use db::Database;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token lifetime and refresh policy
    pub authority: AuthoritySettings,
    /// Refresh requests allowed per client IP per minute
    pub refresh_per_minute: u32,
    /// Value of Access-Control-Allow-Origin
    pub allowed_origin: String,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let authority = TokenAuthority::new(config.db.clone(), config.authority.clone());
    let rate_limit = Arc::new(RateLimitConfig::new(config.refresh_per_minute));
    let cors = CorsConfig::new(&config.allowed_origin);

    Router::new().nest("/api", create_api_router(authority, rate_limit, cors))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
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
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
