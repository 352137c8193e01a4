use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use log::{debug, error};
use serde_json::json;

use crate::error::EngineError;

#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    /// Re-ingestion failed; the previous snapshot is still being served.
    Reload(anyhow::Error),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Reload(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::NotReady) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Engine(EngineError::NoData) => StatusCode::NOT_FOUND,
            ApiError::Engine(err) if err.is_rejected_input() => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) | ApiError::Reload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Engine(err) => {
                debug!("request not served: {err}");
                err.to_string()
            }
            ApiError::Reload(err) => {
                error!("reload failed: {err:#}");
                format!("reload failed: {err:#}")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
