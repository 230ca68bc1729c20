//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the secret source and record store named by configuration
//! - Wire the dispatcher and HTTP server
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::header::InvalidHeaderValue;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{ApiConfig, SecretProvider, SecretsConfig, StoreConfig};
use crate::http::{ApiServer, Dispatcher};
use crate::lifecycle::Shutdown;
use crate::secrets::{EnvSecretSource, FileSecretSource, SecretSource};
use crate::store::{MemoryResponseStore, ResponseStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to prepare record store: {0}")]
    Store(#[from] StoreError),

    #[error("invalid allowed origin: {0}")]
    Cors(#[from] InvalidHeaderValue),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Secret backend for the configured provider.
pub fn secret_source(config: &SecretsConfig) -> Arc<dyn SecretSource> {
    match config.provider {
        SecretProvider::Env => Arc::new(EnvSecretSource::new()),
        SecretProvider::File => Arc::new(FileSecretSource::new()),
    }
}

/// In-process record table, seeded when a seed file is configured.
pub async fn memory_store(config: &StoreConfig) -> Result<MemoryResponseStore, StoreError> {
    let mut store = MemoryResponseStore::new(config.table_name.clone().unwrap_or_default());
    if config.status_index_enabled {
        store = store.with_status_index(config.status_index.clone());
    }
    if let Some(seed) = &config.seed_path {
        store.load_seed(Path::new(seed)).await?;
    }
    Ok(store)
}

/// A server accepting traffic in a background task.
pub struct RunningServer {
    pub local_addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningServer {
    /// Wait for the server to stop on its own (after a shutdown trigger).
    pub async fn wait(self) -> Result<(), StartupError> {
        self.handle.await??;
        Ok(())
    }

    /// Trigger shutdown and wait for in-flight requests to drain.
    pub async fn stop(self) -> Result<(), StartupError> {
        self.shutdown.trigger();
        self.wait().await
    }
}

/// Wire everything and start serving on `config.listener.bind_address`.
pub async fn start(
    config: &ApiConfig,
    secrets: Arc<dyn SecretSource>,
    store: Arc<dyn ResponseStore>,
) -> Result<RunningServer, StartupError> {
    let dispatcher = Dispatcher::from_config(config, secrets, store)?;
    let server = ApiServer::new(Arc::new(dispatcher));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, rx));

    Ok(RunningServer {
        local_addr,
        shutdown,
        handle,
    })
}
