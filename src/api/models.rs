//! Model capability endpoints.

use crate::api::{AppState, ModelsResponse};
use crate::capability::ResolvedProfile;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

/// GET /v1/models - List the capability catalog in configuration order.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        object: "list".to_string(),
        data: state.catalog.list(),
    })
}

/// GET /v1/models/:id - Profile the router would use for this id.
///
/// Unknown ids resolve to the default profile with `known: false`.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<String>,
) -> Json<ResolvedProfile> {
    Json(state.catalog.resolve(&model_id))
}
