use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::api::{self, AppState};
use super::db::{DbHandle, GalleryDb};
use super::ws;

/// Configuration for the gallery server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// `*` allows any origin.
    pub allowed_origin: String,
    pub storage_limit: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            db_path: PathBuf::from(".vizzy/gallery.db"),
            allowed_origin: "*".to_string(),
            storage_limit: crate::config::DEFAULT_STORAGE_LIMIT,
        }
    }
}

/// Build the full application router with API and WebSocket routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_tx = state.ws_tx.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::ws_handler_with_sender(ws_upgrade, ws_tx)),
        )
        .with_state(state)
}

/// CORS policy for cross-origin clients of the batch endpoints.
pub fn cors_layer(allowed_origin: &str) -> Result<CorsLayer> {
    let origin = if allowed_origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(allowed_origin.trim())
            .with_context(|| format!("Invalid allowed origin '{}'", allowed_origin))?;
        AllowOrigin::exact(value)
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Open the database and build router state from config.
pub fn open_state(config: &ServerConfig) -> Result<Arc<AppState>> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = GalleryDb::new(&config.db_path).context("Failed to initialize gallery database")?;
    let (ws_tx, _rx) = broadcast::channel::<String>(256);

    Ok(Arc::new(AppState {
        db: DbHandle::new(db),
        ws_tx,
        storage_limit: config.storage_limit,
    }))
}

/// Start the gallery server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let state = open_state(&config)?;
    let app = build_router(state)
        .layer(cors_layer(&config.allowed_origin)?)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(db = %config.db_path.display(), "database ready");
    println!("Vizzy gallery running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
    info!("shutting down");
}
