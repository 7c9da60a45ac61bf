//! Delivery queue inspection and manual drain.

use crate::api::{AppState, DrainResponse, QueueResponse};
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /v1/queue - Live entries, oldest first.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<QueueResponse> {
    let entries = state.store.list().await;
    Json(QueueResponse {
        depth: entries.len(),
        entries,
    })
}

/// POST /v1/queue/drain - Run a drain pass unless one is running.
pub async fn drain(State(state): State<Arc<AppState>>) -> Json<DrainResponse> {
    match state.processor.drain().await {
        Some(report) => Json(DrainResponse::Report(report)),
        None => Json(DrainResponse::Skipped { skipped: true }),
    }
}
