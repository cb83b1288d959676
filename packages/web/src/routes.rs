use axum::Json;
use serde::{Deserialize, Serialize};

pub mod classifications;
pub mod health;
pub mod scan;

#[derive(Serialize, Deserialize, Debug)]
pub struct WelcomeResponse {
    pub message: String,
}

#[tracing::instrument(name = "GET /")]
pub async fn home() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to NeuroScan AI API".to_string(),
    })
}
