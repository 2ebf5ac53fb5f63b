//! HomeKey Relay
//!
//! HTTP service around the property assistant: streams chat replies from a
//! hosted model, serves property intelligence and composes the property
//! context the assistant is grounded on.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod prompt;
pub mod relay;

use config::RelayConfig;
use handlers::{create_router, AppState};
use homekey_catalog::{CatalogError, IntelligenceCatalog};
use homekey_domain::IntelligenceSource;
use homekey_llm::{LlmError, OpenAiProvider};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use relay::{ChatRelay, RelayError, RelayStream};

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Intelligence table could not be loaded
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Model provider could not be constructed
    #[error("Model error: {0}")]
    Model(#[from] LlmError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the shared state from configuration
///
/// Loads the intelligence table and the model provider. The API key is read
/// from the environment variable named in the config.
pub fn build_state(config: &RelayConfig) -> Result<AppState, ServerError> {
    let catalog = match &config.catalog_path {
        Some(path) => {
            info!("Loading intelligence table from {}", path.display());
            IntelligenceCatalog::from_file(path)?
        }
        None => IntelligenceCatalog::builtin()?,
    };

    let api_key = config.model.api_key()?;
    let provider = OpenAiProvider::new(&config.model.base_url, &config.model.model, api_key)?
        .with_buffer(config.stream_buffer);

    let relay = ChatRelay::new(Arc::new(provider))
        .with_ceiling(config.request_timeout())
        .with_buffer(config.stream_buffer);

    Ok(AppState {
        relay: Arc::new(relay),
        catalog: Arc::new(catalog),
    })
}

/// Start the relay HTTP server
///
/// Builds state from `config` and serves until Ctrl-C.
pub async fn start_server(config: RelayConfig) -> Result<(), ServerError> {
    info!("Starting HomeKey relay");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {} at {}", config.model.model, config.model.base_url);
    info!("Request ceiling: {} seconds", config.request_timeout_secs);

    let state = build_state(&config)?;
    info!(
        "Intelligence table {} with {} properties",
        state.catalog.version(),
        state.catalog.len()
    );

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Relay listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
