mod app;
mod format;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use gamestore_core::{
    catalog::{CatalogClient, CatalogStore, CatalogSync},
    config::{self, AppConfig},
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(path = %config_path.display(), api = %config.api_base_url, "Configuration loaded");

    let client = CatalogClient::new(&config)?;
    let sync = CatalogSync::new(client);

    let (sync_tx, sync_rx) = mpsc::channel(8);
    let initial = sync.clone();
    let initial_tx = sync_tx.clone();
    tokio::spawn(async move {
        if let Err(err) = initial.run(initial_tx).await {
            tracing::error!("Catalog sync task error: {err}");
        }
    });

    let mut app = app::StoreApp::new(config, CatalogStore::new(), sync);
    app.attach_sync(sync_tx, sync_rx);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("gamestore.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::from_default_env();

    // stdout belongs to the terminal UI; logs go to file only.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
