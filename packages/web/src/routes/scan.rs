use crate::{bad_request, not_found};
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use neuroscan_model::preprocess::decode;
use neuroscan_model::{Error, predict};
use neuroscan_storage::{ScanRecord, parse_patient_info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

#[derive(Serialize, Deserialize, Debug)]
pub struct UploadResponse {
    pub scan_id: String,
    pub result: ScanRecord,
}

struct UploadForm {
    file: Option<Bytes>,
    patient_info: Option<String>,
}

async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm {
        file: None,
        patient_info: None,
    };
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let is_image = field
                    .content_type()
                    .is_some_and(|ct| ct.starts_with("image/"));
                if !is_image {
                    return Err(ApiError::bad_request("Invalid file type. Image expected."));
                }
                form.file = Some(field.bytes().await?);
            }
            Some("patientInfo") => form.patient_info = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

/// Classify an uploaded scan and persist image and result under a new id.
///
/// The image is written before inference. If inference fails the scan stays
/// image-only and is completed by the next `GET /scan-results/{id}`.
#[tracing::instrument(name = "POST /upload-scan/", skip(state, multipart))]
pub async fn upload_scan(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let classifier = state.model.classifier()?;

    let form = read_form(&mut multipart).await?;
    let Some(bytes) = form.file else {
        return Err(bad_request!("No file uploaded"));
    };
    let patient_info = form.patient_info.as_deref().and_then(parse_patient_info);

    let image = tokio::task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| Error::Task(e.to_string()))??;
    let image = Arc::new(image);

    let scan_id = state.store.save_image(image.clone()).await?;

    let started = Instant::now();
    let prediction = tokio::task::spawn_blocking(move || predict(classifier.as_ref(), &image))
        .await
        .map_err(|e| Error::Task(e.to_string()))??;
    metrics::histogram!("inference_duration_seconds").record(started.elapsed().as_secs_f64());

    let record = ScanRecord::new(&scan_id, prediction, patient_info);
    state.store.put_record(&record).await?;
    metrics::counter!("scans_uploaded_total").increment(1);
    tracing::info!(
        scan_id = %scan_id,
        classification = %record.prediction.classification,
        "Scan classified"
    );

    Ok(Json(UploadResponse {
        scan_id,
        result: record,
    }))
}

#[tracing::instrument(name = "GET /scan-results/{scan_id}", skip(state))]
pub async fn get_scan_results(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<ScanRecord>, ApiError> {
    let record = state.store.get_or_compute(&scan_id, &state.model).await?;
    Ok(Json(record))
}

/// Serves `/{scan_id}.jpg`.
#[tracing::instrument(name = "GET /{scan_id}.jpg", skip(state))]
pub async fn get_scan_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let Some(scan_id) = file.strip_suffix(".jpg") else {
        return Err(not_found!("Image not found"));
    };
    let bytes = state.store.get_image(scan_id).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}
