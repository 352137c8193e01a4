use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use log::info;
use serde_json::{json, Value};

use super::{ApiError, SharedState};
use crate::data::filter::{FilterParams, FilterSpec, QueryPage};
use crate::data::model::CleaningSummary;
use crate::data::outliers::{OutlierParams, OutlierReport, OutlierRequest};
use crate::data::stats::SummaryStatistics;

pub async fn index() -> Json<Value> {
    Json(json!({
        "routes": {
            "/api/health": "Service readiness",
            "/api/observations": "Cleaned observations; filters: start, end, min_temp, max_temp, min_sal, max_sal, min_odo, max_odo, limit, skip",
            "/api/stats": "Summary statistics for temperature, salinity and odo",
            "/api/outliers": "Outlier report; params: field, method (iqr|zscore), k",
            "/api/summary": "Cleaning results",
            "/api/reload": "POST: reload and re-clean the data source",
        }
    }))
}

pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    if state.store.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "loading" })),
        )
    }
}

pub async fn observations(
    State(state): State<SharedState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<QueryPage>, ApiError> {
    let spec = FilterSpec::from_params(&params)?;
    Ok(Json(state.store.query(&spec)?))
}

pub async fn stats(State(state): State<SharedState>) -> Result<Json<SummaryStatistics>, ApiError> {
    Ok(Json(state.store.summary_statistics()?))
}

pub async fn outliers(
    State(state): State<SharedState>,
    Query(params): Query<OutlierParams>,
) -> Result<Json<OutlierReport>, ApiError> {
    let request = OutlierRequest::from_params(&params)?;
    Ok(Json(state.store.detect_outliers(&request)?))
}

pub async fn summary(State(state): State<SharedState>) -> Result<Json<CleaningSummary>, ApiError> {
    Ok(Json(state.store.cleaning_summary()?))
}

/// Ingestion reads and scans the whole file, so it runs off the async workers.
pub async fn reload(State(state): State<SharedState>) -> Result<Json<CleaningSummary>, ApiError> {
    let worker = Arc::clone(&state);
    let provenance = tokio::task::spawn_blocking(move || worker.store.reload(&worker.ingest))
        .await
        .map_err(|e| ApiError::Reload(e.into()))??;
    info!(
        "Reloaded {}: {} rows remaining",
        state.ingest.data_file.display(),
        provenance.remaining_count()
    );
    Ok(Json(provenance.summary()))
}
