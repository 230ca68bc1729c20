//! responses-api server binary.
//!
//! Loads configuration (TOML file plus environment overrides), installs
//! logging and the optional metrics exporter, builds the secret source and the
//! record store, then serves until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use responses_api::config::load_config;
use responses_api::lifecycle::{signals, startup};
use responses_api::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "responses-api")]
#[command(about = "Authenticated API over questionnaire responses", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "responses-api starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        table = config.store.table_name.as_deref().unwrap_or("<unset>"),
        status_index = %config.store.status_index,
        secret_configured = config.secrets.secret_id.is_some(),
        "Configuration loaded"
    );
    if config.store.table_name.is_none() {
        tracing::warn!("No record table configured; record routes will answer 500");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let secrets = startup::secret_source(&config.secrets);
    let store = Arc::new(startup::memory_store(&config.store).await?);
    let running = startup::start(&config, secrets, store).await?;

    signals::shutdown_on_signal(&running.shutdown).await;
    running.wait().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
