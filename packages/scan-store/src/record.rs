use chrono::{DateTime, Utc};
use neuroscan_model::PredictionResult;
use serde::{Deserialize, Serialize};

/// Free-form patient metadata attached at upload time.
pub type PatientInfo = serde_json::Map<String, serde_json::Value>;

/// One scan: the stored image plus its classification.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub image_url: String,
    pub prediction: PredictionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<PatientInfo>,
}

impl ScanRecord {
    pub fn new(id: &str, prediction: PredictionResult, patient_info: Option<PatientInfo>) -> Self {
        Self {
            id: id.to_string(),
            timestamp: Utc::now(),
            image_url: image_url(id),
            prediction,
            patient_info,
        }
    }
}

pub fn image_url(id: &str) -> String {
    format!("/uploads/{}", image_file_name(id))
}

pub(crate) fn image_file_name(id: &str) -> String {
    format!("{}.jpg", id)
}

pub(crate) fn record_file_name(id: &str) -> String {
    format!("{}_result.json", id)
}

/// Parse the optional `patientInfo` form field.
///
/// Anything that is not a JSON object is logged and dropped.
pub fn parse_patient_info(raw: &str) -> Option<PatientInfo> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        Ok(other) => {
            tracing::warn!("Ignoring non-object patientInfo: {}", other);
            None
        }
        Err(e) => {
            tracing::warn!("Invalid JSON in patientInfo ({}): {}", e, raw);
            None
        }
    }
}
