//! permres REST API Server
//!
//! Run with: cargo run --features server --bin permres-server
//!
//! Settings come from the JSON file named by `PERMRES_CONFIG` (if set), then
//! `PERMRES_DB`, `PERMRES_MAP_SIZE`, `PERMRES_MAX_GROUP_DEPTH` and `PORT`.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use permres::server::{router, AppState};
use permres::{LmdbStore, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load()?;
    info!(path = %config.store.path.display(), "initializing database");
    let store = Arc::new(LmdbStore::open(&config.store)?);
    let app = router(Arc::new(AppState::new(store)));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(addr = %config.bind, "permres server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
