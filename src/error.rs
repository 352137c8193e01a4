use thiserror::Error;

/// Failures of the read-path operations (query, statistics, outliers).
///
/// Fatal ingestion failures are reported through `anyhow` instead, since
/// they only ever end the process or abort a reload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("data not loaded")]
    NotReady,

    #[error("no data available")]
    NoData,

    #[error("field '{0}' not found")]
    UnknownField(String),

    #[error("method must be 'iqr' or 'zscore', got '{0}'")]
    UnknownMethod(String),

    #[error("invalid value '{value}' for '{name}': {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl EngineError {
    pub fn invalid(name: &str, value: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller sent something we refuse to act on.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownField(_)
                | EngineError::UnknownMethod(_)
                | EngineError::InvalidParameter { .. }
        )
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
