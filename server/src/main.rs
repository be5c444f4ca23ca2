mod config;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use crate::config::{ConfigError, ServerConfig};
use crate::store::{ElementStore, MemoryElementStore, PgElementStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("store init failed: {0}")]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt::init();

    // Missing .env is fine; deployments set the environment directly.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "ignoring unreadable .env");
        }
    }

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn ElementStore> = match &config.database_url {
        Some(url) => {
            let store = PgElementStore::connect(url, config.db_max_connections).await?;
            tracing::info!(max_connections = config.db_max_connections, "postgres element store ready");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; elements are kept in memory and lost on restart");
            Arc::new(MemoryElementStore::new())
        }
    };

    let state = state::AppState::new(store, config.client_channel_capacity);

    // Spawn background persistence task.
    let _persistence = services::persistence::spawn_flush_task(state.clone(), config.flush_interval);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "canvas relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
