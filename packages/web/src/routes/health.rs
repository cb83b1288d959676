use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

#[tracing::instrument(name = "GET /health", skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = if state.model.is_ready() {
        "ready"
    } else {
        "unavailable"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        model: model.to_string(),
    })
}
