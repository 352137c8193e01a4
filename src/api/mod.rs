//! HTTP surface over the record store.
//!
//! Routes:
//! - `GET  /`                  route index
//! - `GET  /api/health`        readiness
//! - `GET  /api/observations`  filtered, paged observations
//! - `GET  /api/stats`         summary statistics per required field
//! - `GET  /api/outliers`      on-demand IQR / z-score report
//! - `GET  /api/summary`       cleaning provenance
//! - `POST /api/reload`        re-run ingestion from the configured source

mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::config::IngestConfig;
use crate::store::RecordStore;

pub use error::ApiError;

pub struct AppState {
    pub store: RecordStore,
    /// Source used by `/api/reload`.
    pub ingest: IngestConfig,
}

impl AppState {
    pub fn new(store: RecordStore, ingest: IngestConfig) -> Self {
        Self { store, ingest }
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .route("/api/observations", get(handlers::observations))
        .route("/api/stats", get(handlers::stats))
        .route("/api/outliers", get(handlers::outliers))
        .route("/api/summary", get(handlers::summary))
        .route("/api/reload", post(handlers::reload))
        .with_state(state)
}
