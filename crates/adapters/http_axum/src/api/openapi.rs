//! `GET /openapi.json`

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::state::AppState;

/// Serve the OpenAPI document built when the API was assembled.
pub async fn document(State(state): State<AppState>) -> Json<Value> {
    Json(state.api.openapi().clone())
}
