//! Health check endpoint handler.

use crate::api::{AppState, HealthResponse};
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /health - Return reachability and queue status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let reachable = state.monitor.is_reachable();
    Json(HealthResponse {
        status: if reachable { "healthy" } else { "degraded" }.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        reachable,
        queue_depth: state.store.depth().await,
        draining: state.processor.is_draining(),
    })
}
