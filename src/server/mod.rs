// Redactor - HTTP Server Module
// API surface for redaction and model training

mod handlers;
mod request;

pub use handlers::{create_router, ApiError};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::models::ModelStore;
use crate::redaction::RedactionService;
use crate::training::TrainingOrchestrator;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5000")
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Shared state handed to every request handler
pub struct AppState {
    store: Arc<ModelStore>,
    orchestrator: Arc<TrainingOrchestrator>,
    redaction: RedactionService,
    started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<TrainingOrchestrator>, redaction: RedactionService) -> Self {
        Self {
            store: Arc::clone(orchestrator.store()),
            orchestrator,
            redaction,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<TrainingOrchestrator> {
        &self.orchestrator
    }

    pub fn redaction(&self) -> &RedactionService {
        &self.redaction
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Main redaction server
pub struct RedactorServer {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl RedactorServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            state: Arc::new(state),
            config,
        }
    }

    /// Start the HTTP server and run until it fails
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.config.bind_address))?;

        let app = create_router(self.state).layer(TraceLayer::new_for_http());

        tracing::info!("Starting redactor server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
