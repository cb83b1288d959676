/// Errors raised anywhere along the upload → preprocess → infer → persist pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Model not loaded on server.")]
    ModelUnavailable,
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Image preprocessing failed: {0}")]
    Preprocessing(String),
    #[error("Prediction failed: {0}")]
    Prediction(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Malformed scan record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Background task failed: {0}")]
    Task(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn preprocessing(msg: impl std::fmt::Display) -> Self {
        Self::Preprocessing(msg.to_string())
    }

    pub fn model_load(msg: impl std::fmt::Display) -> Self {
        Self::ModelLoad(msg.to_string())
    }

    pub fn prediction(msg: impl std::fmt::Display) -> Self {
        Self::Prediction(msg.to_string())
    }
}
