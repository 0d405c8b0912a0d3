//! Reportdesk HTTP API Server
//!
//! Exposes report template management, usage tracking, report validation
//! and narrative prompt composition over REST.

use axum::{Router, extract::DefaultBodyLimit};
use reportdesk_registry::{Registry, SqliteStorage};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

mod config;
mod error;
mod identity;
mod models;
mod routes;

use config::ServerConfig;
use error::Result;

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry<SqliteStorage>>,
    pub config: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "reportdesk_server=debug,tower_http=debug".to_string()),
        )
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    info!("Starting Reportdesk Server on {}:{}", config.host, config.port);

    ensure_database_dir(&config.database_url)?;
    let storage = SqliteStorage::new(&config.database_url).await?;
    let registry = Arc::new(Registry::new(storage));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| error::ApiError::Config(format!("Invalid HOST value: {}", config.host)))?;

    let state = AppState { registry, config };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the parent directory of a file-backed SQLite database
fn ensure_database_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let path = path.trim_start_matches("//");
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// API routes
fn api_routes() -> Router<AppState> {
    Router::new().nest("/templates", routes::templates::router())
}
