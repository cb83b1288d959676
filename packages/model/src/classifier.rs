use crate::error::{Error, Result};
use crate::prediction::{PredictionResult, format};
use crate::preprocess::{InputSize, preprocess};
use image::DynamicImage;
use ndarray::Array4;
use std::sync::Arc;

/// A loaded model that maps a preprocessed batch to raw per-class scores.
///
/// Implementations block; async callers go through `spawn_blocking`.
pub trait Classifier: Send + Sync {
    fn input_size(&self) -> InputSize;

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

/// Outcome of loading the model at startup.
///
/// The server starts either way; requests that need inference fail with
/// [`Error::ModelUnavailable`] while the handle is unavailable.
#[derive(Clone)]
pub enum ModelHandle {
    Ready(Arc<dyn Classifier>),
    Unavailable { reason: String },
}

impl ModelHandle {
    pub fn ready(classifier: impl Classifier + 'static) -> Self {
        ModelHandle::Ready(Arc::new(classifier))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelHandle::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelHandle::Ready(_))
    }

    pub fn classifier(&self) -> Result<Arc<dyn Classifier>> {
        match self {
            ModelHandle::Ready(classifier) => Ok(classifier.clone()),
            ModelHandle::Unavailable { .. } => Err(Error::ModelUnavailable),
        }
    }

    /// Run the full preprocess → classify → format pipeline on one image.
    pub fn predict(&self, image: &DynamicImage) -> Result<PredictionResult> {
        let classifier = self.classifier()?;
        predict(classifier.as_ref(), image)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelHandle::Ready(classifier) => f
                .debug_struct("Ready")
                .field("input_size", &classifier.input_size())
                .finish(),
            ModelHandle::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

pub fn predict(classifier: &dyn Classifier, image: &DynamicImage) -> Result<PredictionResult> {
    let input = preprocess(image, classifier.input_size())?;
    let raw = classifier.classify(&input)?;
    format(&raw)
}
