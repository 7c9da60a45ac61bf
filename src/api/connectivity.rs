//! Connectivity events over HTTP.

use crate::api::{ApiError, AppState, ConnectivityUpdate};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

/// GET /v1/connectivity - Current reachability.
pub async fn get(State(state): State<Arc<AppState>>) -> Json<ConnectivityUpdate> {
    Json(ConnectivityUpdate {
        reachable: state.monitor.is_reachable(),
    })
}

/// POST /v1/connectivity - Report an online/offline transition.
pub async fn update(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConnectivityUpdate>, JsonRejection>,
) -> Result<Json<ConnectivityUpdate>, ApiError> {
    let Json(update) = body?;
    state.manual.set_reachable(update.reachable);
    Ok(Json(ConnectivityUpdate {
        reachable: state.monitor.is_reachable(),
    }))
}
