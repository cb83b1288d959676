use axum::Json;
use neuroscan_model::{ClassificationMetadata, classification_metadata};

#[tracing::instrument(name = "GET /classifications/")]
pub async fn get_classifications() -> Json<Vec<ClassificationMetadata>> {
    Json(classification_metadata())
}
