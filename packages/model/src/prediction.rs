use crate::classes::{CLASSES, TumorClass};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labeled classifier output for one scan.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub classification: TumorClass,
    pub confidence: f32,
    pub probabilities: BTreeMap<TumorClass, f32>,
}

/// Shape the raw per-class score vector of a single input.
///
/// The first maximum wins, so ties resolve to the earlier class in [`CLASSES`].
pub fn format(raw: &[f32]) -> Result<PredictionResult> {
    if raw.len() != CLASSES.len() {
        return Err(Error::prediction(format!(
            "expected {} class scores, model returned {}",
            CLASSES.len(),
            raw.len()
        )));
    }
    if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
        return Err(Error::prediction(format!("non-finite class score {}", bad)));
    }

    let mut best = 0;
    for (i, score) in raw.iter().enumerate().skip(1) {
        if *score > raw[best] {
            best = i;
        }
    }

    let probabilities = CLASSES.iter().copied().zip(raw.iter().copied()).collect();

    let result = PredictionResult {
        classification: CLASSES[best],
        confidence: raw[best],
        probabilities,
    };
    tracing::info!(
        "Prediction: {} (confidence: {:.2}%)",
        result.classification,
        result.confidence * 100.0
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_highest_score() {
        let result = format(&[0.1, 0.2, 0.6, 0.1]).unwrap();
        assert_eq!(result.classification, TumorClass::NoTumor);
        assert_eq!(result.confidence, 0.6);
    }

    #[test]
    fn confidence_is_the_max_probability() {
        let result = format(&[0.05, 0.7, 0.05, 0.2]).unwrap();
        let max = result
            .probabilities
            .values()
            .copied()
            .fold(f32::MIN, f32::max);
        assert_eq!(result.confidence, max);
    }

    #[test]
    fn keys_are_exactly_the_class_set() {
        let result = format(&[0.25, 0.25, 0.25, 0.25]).unwrap();
        let keys: Vec<TumorClass> = result.probabilities.keys().copied().collect();
        assert_eq!(keys, CLASSES.to_vec());
    }

    #[test]
    fn ties_resolve_to_first_class() {
        let result = format(&[0.1, 0.4, 0.4, 0.1]).unwrap();
        assert_eq!(result.classification, TumorClass::Meningioma);
    }

    #[test]
    fn wrong_arity_is_a_prediction_error() {
        let err = format(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, Error::Prediction(_)));
    }

    #[test]
    fn nan_is_a_prediction_error() {
        let err = format(&[0.1, f32::NAN, 0.2, 0.3]).unwrap_err();
        assert!(matches!(err, Error::Prediction(_)));
    }

    #[test]
    fn serializes_with_class_ids() {
        let result = format(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["classification"], "pituitary");
        assert!(json["probabilities"].get("no_tumor").is_some());
        let back: PredictionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
