//! Yardkeep Server - Inventory HTTP API
//!
//! JSON endpoints over the part snapshot and the command log.

pub mod config;
pub mod http;

use std::sync::Arc;

use axum::{
    routing::{get, MethodRouter},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use yardkeep_core::{Inventory, JsonFileStore, StoreConfig};

pub use config::ServerConfig;

/// Shared application state
pub struct AppState {
    pub inventory: Inventory<JsonFileStore>,
    /// Held across load→mutate→save so writes in this process never interleave
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: StoreConfig) -> Self {
        Self {
            inventory: Inventory::new(JsonFileStore::new(store)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

fn with_cors_fallbacks(router: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    router
        .options(http::preflight)
        .fallback(http::method_not_allowed)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/inventory",
            with_cors_fallbacks(
                get(http::list_parts)
                    .post(http::upsert_part)
                    .delete(http::delete_part),
            ),
        )
        .route(
            "/commands",
            with_cors_fallbacks(get(http::list_commands).post(http::record_command)),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(config.store.clone()));
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!(
        "Yardkeep server listening on {} (data in {:?})",
        config.addr,
        config.store.data_dir
    );
    axum::serve(listener, app).await?;
    Ok(())
}
