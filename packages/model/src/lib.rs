/// Fixed diagnostic class set and its reference metadata
pub mod classes;
/// Classifier seam and the startup model handle
pub mod classifier;
pub mod error;
/// ONNX Runtime model loading and inference
#[cfg(feature = "onnx")]
pub mod onnx;
/// Raw score vector to labeled prediction
pub mod prediction;
/// Image decoding and tensor normalization
pub mod preprocess;

pub use classes::{CLASSES, ClassificationMetadata, TumorClass, classification_metadata};
pub use classifier::{Classifier, ModelHandle, predict};
pub use error::{Error, Result};
pub use prediction::PredictionResult;
pub use preprocess::InputSize;

pub use image;
pub use ndarray;
