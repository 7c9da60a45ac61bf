//! Submission and routing preview endpoints.

use crate::api::{ApiError, AppState};
use crate::gateway::{RoutePreview, SubmitRequest, SubmitResponse};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use tracing::info;

/// POST /v1/generate - Run a request now or queue it.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(submission) = body?;
    info!(model = %submission.model_id, hint = ?submission.hint, "Generate request");

    let response = state.gateway.submit(submission).await?;
    Ok(Json(response))
}

/// POST /v1/route - Routing decision for a submission, without executing it.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<RoutePreview>, ApiError> {
    let Json(submission) = body?;
    Ok(Json(state.gateway.preview(&submission)))
}
