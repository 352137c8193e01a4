use std::sync::Arc;

use anyhow::{Context, Result};
use asv_quality::api::{self, AppState};
use asv_quality::{Config, RecordStore};
use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let ingest = config.ingest()?;

    // Nothing is served until the store holds a complete, cleaned snapshot.
    let store = RecordStore::load(&ingest)
        .with_context(|| format!("loading {}", ingest.data_file.display()))?;

    let app = api::router(Arc::new(AppState::new(store, ingest)));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("API ready on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        // No signal handler: run until killed.
        Err(_) => std::future::pending::<()>().await,
    }
}
