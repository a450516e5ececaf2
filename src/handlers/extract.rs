//! The three extraction endpoints: batch JSON, streaming JSON, and
//! streaming CSV export, all driving the same `Orchestrator`.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app_state::AppState;
use crate::csv_export;
use crate::errors::AppError;
use crate::models::{BatchResponse, ExtractRequest};
use crate::streaming;

fn validate(state: &AppState, req: &ExtractRequest) -> Result<(), AppError> {
    if req.bundle_ids.is_empty() {
        return Err(AppError::RequestInvalid("bundleIds must not be empty".to_string()));
    }
    if req.bundle_ids.len() > state.config.max_bundle_ids {
        return Err(AppError::RequestInvalid(format!(
            "bundleIds exceeds the maximum of {}",
            state.config.max_bundle_ids
        )));
    }
    if req.search_terms.len() > state.config.max_search_terms {
        return Err(AppError::RequestInvalid(format!(
            "searchTerms exceeds the maximum of {}",
            state.config.max_search_terms
        )));
    }
    Ok(())
}

pub async fn extract_multiple(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    validate(&state, &req)?;

    let started_at = Instant::now();
    let results = state
        .orchestrator
        .run_batch(req.bundle_ids, req.search_terms)
        .await;

    let success_count = results.iter().filter(|r| r.is_success()).count();
    let error_count = results.len() - success_count;
    let cache_stats = state.cache.stats().await;

    Ok(Json(BatchResponse {
        success: true,
        total_processed: results.len(),
        success_count,
        error_count,
        processing_time: format!("{}ms", started_at.elapsed().as_millis()),
        cache_stats,
        results,
    }))
}

pub async fn stream_extract_multiple(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Response, AppError> {
    validate(&state, &req)?;

    let rx = state.orchestrator.run_stream(req.bundle_ids, req.search_terms);
    let body = Body::from_stream(streaming::json_body_stream(rx, state.cache.clone()));

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}

pub async fn stream_export_csv(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Response, AppError> {
    validate(&state, &req)?;

    let rx = state.orchestrator.run_stream(req.bundle_ids, req.search_terms);
    let body = Body::from_stream(csv_export::csv_body_stream(rx));

    Ok((
        [(header::CONTENT_TYPE, "text/csv")],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::SearchTerm;

    fn test_state() -> AppState {
        let mut config = Config::load();
        config.max_bundle_ids = 2;
        config.max_search_terms = 1;
        AppState::new(config).unwrap()
    }

    #[test]
    fn rejects_empty_bundle_ids() {
        let state = test_state();
        let req = ExtractRequest { bundle_ids: vec![], search_terms: vec![] };
        assert!(validate(&state, &req).is_err());
    }

    #[test]
    fn rejects_too_many_bundle_ids() {
        let state = test_state();
        let req = ExtractRequest {
            bundle_ids: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            search_terms: vec![],
        };
        assert!(validate(&state, &req).is_err());
    }

    #[test]
    fn rejects_too_many_search_terms() {
        let state = test_state();
        let req = ExtractRequest {
            bundle_ids: vec!["a".to_string()],
            search_terms: vec![SearchTerm::FreeText("x".to_string()), SearchTerm::FreeText("y".to_string())],
        };
        assert!(validate(&state, &req).is_err());
    }

    #[test]
    fn accepts_within_limits() {
        let state = test_state();
        let req = ExtractRequest { bundle_ids: vec!["a".to_string()], search_terms: vec![] };
        assert!(validate(&state, &req).is_ok());
    }
}
