//! ONNX Runtime backed classifier.
//!
//! The artifact is loaded once at startup. A missing or broken artifact does
//! not stop the server: [`load`] reports it through the log and returns
//! [`ModelHandle::Unavailable`] so that only inference requests fail.

use crate::classifier::{Classifier, ModelHandle};
use crate::error::{Error, Result};
use crate::preprocess::{InputSize, zeros};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Clone, Debug)]
pub struct OnnxConfig {
    pub model_path: PathBuf,
    /// Used when the artifact does not declare a static NHWC input.
    pub input_size: InputSize,
    /// ORT graph optimization level, 0 (disabled) to 3 (all).
    pub optimization_level: u8,
    pub intra_threads: Option<usize>,
}

impl Default for OnnxConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.onnx"),
            input_size: InputSize::default(),
            optimization_level: 3,
            intra_threads: None,
        }
    }
}

/// Maps `0..=3` onto ORT's optimization levels.
pub fn optimization_level(level: u8) -> Option<GraphOptimizationLevel> {
    match level {
        0 => Some(GraphOptimizationLevel::Disable),
        1 => Some(GraphOptimizationLevel::Level1),
        2 => Some(GraphOptimizationLevel::Level2),
        3 => Some(GraphOptimizationLevel::Level3),
        _ => None,
    }
}

pub struct OnnxClassifier {
    // ORT sessions need exclusive access to run
    session: Mutex<Session>,
    input_size: InputSize,
}

impl OnnxClassifier {
    pub fn from_config(config: &OnnxConfig) -> Result<Self> {
        let path = &config.model_path;
        let level = optimization_level(config.optimization_level).ok_or_else(|| {
            Error::model_load(format!(
                "invalid optimization level {}",
                config.optimization_level
            ))
        })?;

        let mut builder = Session::builder()
            .map_err(|e| Error::model_load(format!("failed to create ONNX session: {}", e)))?
            .with_optimization_level(level)
            .map_err(|e| Error::model_load(format!("failed to set optimization level: {}", e)))?;
        if let Some(threads) = config.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| Error::model_load(format!("failed to set intra threads: {}", e)))?;
        }
        let session = builder
            .commit_from_file(path)
            .map_err(|e| Error::model_load(format!("{}: {}", path.display(), e)))?;

        let fallback_size = config.input_size;
        let input_size = match declared_input_size(&session) {
            Some(declared) => {
                if declared != fallback_size {
                    tracing::warn!(
                        "Model declares input {}x{}, overriding configured {}x{}",
                        declared.width,
                        declared.height,
                        fallback_size.width,
                        fallback_size.height
                    );
                }
                declared
            }
            None => {
                tracing::info!(
                    "Model input shape is dynamic, using configured {}x{}",
                    fallback_size.width,
                    fallback_size.height
                );
                fallback_size
            }
        };

        Ok(Self {
            session: Mutex::new(session),
            input_size,
        })
    }

    /// Force lazy initialization inside the runtime with a throwaway pass.
    pub fn warm_up(&self) -> Result<()> {
        let started = Instant::now();
        self.classify(&zeros(self.input_size))?;
        tracing::debug!("Warm-up inference took {:?}", started.elapsed());
        Ok(())
    }
}

impl Classifier for OnnxClassifier {
    fn input_size(&self) -> InputSize {
        self.input_size
    }

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let (n, h, w, c) = input.dim();
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_array(([n, h, w, c], data))
            .map_err(|e| Error::prediction(format!("failed to build input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(Error::prediction)?;
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(Error::prediction)?;
        Ok(scores.to_vec())
    }
}

/// Height and width of a static `[N, H, W, 3]` input, if the model declares one.
fn declared_input_size(session: &Session) -> Option<InputSize> {
    let input = session.inputs.first()?;
    let dims: Vec<i64> = input.input_type.tensor_shape()?.iter().copied().collect();
    match dims.as_slice() {
        [_, h, w, 3] if *h > 0 && *w > 0 => Some(InputSize {
            width: *w as u32,
            height: *h as u32,
        }),
        _ => None,
    }
}

/// Load and warm up the classifier, degrading to an unavailable handle on failure.
pub fn load(config: &OnnxConfig) -> ModelHandle {
    let path = &config.model_path;
    if !path.exists() {
        tracing::error!("Model not found at {}", path.display());
        return ModelHandle::unavailable(format!("model not found at {}", path.display()));
    }

    tracing::info!("Loading model from: {}", path.display());
    let started = Instant::now();
    let loaded = OnnxClassifier::from_config(config).and_then(|classifier| {
        classifier
            .warm_up()
            .map_err(|e| Error::model_load(format!("warm-up failed: {}", e)))?;
        Ok(classifier)
    });

    match loaded {
        Ok(classifier) => {
            tracing::info!(
                "Model loaded and warmed up in {:?} (input {}x{})",
                started.elapsed(),
                classifier.input_size.width,
                classifier.input_size.height
            );
            ModelHandle::ready(classifier)
        }
        Err(e) => {
            tracing::error!("Error loading model: {}", e);
            ModelHandle::unavailable(e.to_string())
        }
    }
}
