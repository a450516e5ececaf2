use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Request-boundary errors: these abort the whole HTTP response.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("request invalid: {0}")]
    RequestInvalid(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::RequestInvalid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, axum::Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Per-bundle error taxonomy (spec.md §7). These never escape the HTTP
/// boundary directly; their `Display` message is what ends up in
/// `BundleResult::Error.error`.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Unsupported bundle identifier")]
    UnsupportedBundle,
    #[error("Fetch failed: {0}")]
    FetchError(String),
    #[error("Developer domain not found")]
    DomainNotFound,
    #[error("Worker task timed out")]
    WorkerTimeout,
    #[error("Worker memory limit exceeded")]
    WorkerMemoryExceeded,
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors surfaced by the Fetcher (spec.md §4.4). Each variant's message is
/// tagged with its own name so the kind survives once folded into a
/// `PipelineError::FetchError` string (e.g. callers grep for "Oversized").
#[derive(Error, Debug, Clone)]
pub enum FetchErrorKind {
    #[error("Timeout: request timed out")]
    Timeout,
    #[error("Network: {0}")]
    Network(String),
    #[error("HttpError: unexpected status {0}")]
    HttpError(u16),
    #[error("Oversized: response exceeded the size limit")]
    Oversized,
    #[error("Decode: could not decode response body as utf-8")]
    Decode,
}

impl From<FetchErrorKind> for PipelineError {
    fn from(value: FetchErrorKind) -> Self {
        PipelineError::FetchError(value.to_string())
    }
}
