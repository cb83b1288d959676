use crate::record::{PatientInfo, ScanRecord, image_file_name, record_file_name};
use bytes::Bytes;
use dashmap::DashMap;
use neuroscan_model::image::{DynamicImage, ImageFormat};
use neuroscan_model::preprocess::decode;
use neuroscan_model::{Error, ModelHandle, PredictionResult, Result, predict};
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Flat key-value store of scans: `{id}.jpg` next to `{id}_result.json`.
pub struct ScanStore {
    store: Arc<dyn ObjectStore>,
    root: Option<PathBuf>,
    /// Serializes lazy recomputation per scan id.
    recompute_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for ScanStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanStore")
            .field("store", &self.store.to_string())
            .field("root", &self.root)
            .finish()
    }
}

impl ScanStore {
    /// Open (and create if needed) a store rooted at a local directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        let store = LocalFileSystem::new_with_prefix(&root).map_err(storage_error)?;
        Ok(Self {
            store: Arc::new(store),
            root: Some(root),
            recompute_locks: DashMap::new(),
        })
    }

    pub fn with_object_store(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            root: None,
            recompute_locks: DashMap::new(),
        }
    }

    /// Local directory backing the store, if it lives on disk.
    pub fn root(&self) -> Option<&std::path::Path> {
        self.root.as_deref()
    }

    /// Persist an image together with its prediction under a fresh id.
    pub async fn save(
        &self,
        image: Arc<DynamicImage>,
        prediction: PredictionResult,
        patient_info: Option<PatientInfo>,
    ) -> Result<ScanRecord> {
        let id = self.save_image(image).await?;
        let record = ScanRecord::new(&id, prediction, patient_info);
        self.put_record(&record).await?;
        Ok(record)
    }

    /// Mint a scan id and write its image as JPEG. The scan is image-only
    /// until a record is put.
    pub async fn save_image(&self, image: Arc<DynamicImage>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&image))
            .await
            .map_err(|e| Error::Task(e.to_string()))??;
        self.store
            .put(&Path::from(image_file_name(&id)), PutPayload::from(jpeg))
            .await
            .map_err(storage_error)?;
        tracing::debug!("Stored image for scan {}", id);
        Ok(id)
    }

    pub async fn put_record(&self, record: &ScanRecord) -> Result<()> {
        let json = serde_json::to_vec(record)?;
        self.store
            .put(&Path::from(record_file_name(&record.id)), PutPayload::from(json))
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    /// Stored record for `id`, without ever computing one.
    pub async fn get_if_exists(&self, id: &str) -> Result<Option<ScanRecord>> {
        let Some(id) = canonical_id(id) else {
            return Ok(None);
        };
        match self.read(&record_file_name(&id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Stored record for `id`, regenerating and persisting it when only the
    /// image exists.
    pub async fn get_or_compute(&self, id: &str, model: &ModelHandle) -> Result<ScanRecord> {
        if let Some(record) = self.get_if_exists(id).await? {
            return Ok(record);
        }
        let Some(id) = canonical_id(id) else {
            return Err(Error::not_found("Scan ID not found"));
        };

        let slot = RecomputeSlot::acquire(&self.recompute_locks, &id);
        let _guard = slot.lock().await;
        self.recompute(&id, model).await
    }

    async fn recompute(&self, id: &str, model: &ModelHandle) -> Result<ScanRecord> {
        // another request may have finished while we waited for the lock
        if let Some(record) = self.get_if_exists(id).await? {
            return Ok(record);
        }
        let Some(bytes) = self.read(&image_file_name(id)).await? else {
            return Err(Error::not_found("Scan ID not found"));
        };

        let classifier = model.classifier()?;
        let prediction = tokio::task::spawn_blocking(move || {
            let image = decode(&bytes).map_err(Error::preprocessing)?;
            predict(classifier.as_ref(), &image)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))??;

        let record = ScanRecord::new(id, prediction, None);
        self.put_record(&record).await?;
        metrics::counter!("scan_results_recomputed_total").increment(1);
        tracing::info!("Regenerated missing result for scan {}", id);
        Ok(record)
    }

    pub async fn get_image(&self, id: &str) -> Result<Bytes> {
        let not_found = || Error::not_found("Image not found");
        let id = canonical_id(id).ok_or_else(not_found)?;
        self.read(&image_file_name(&id)).await?.ok_or_else(not_found)
    }

    async fn read(&self, name: &str) -> Result<Option<Bytes>> {
        match self.store.get(&Path::from(name)).await {
            Ok(result) => Ok(Some(result.bytes().await.map_err(storage_error)?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }
}

/// Shared handle on the per-id recompute lock. The map entry is removed when
/// the last holder goes away, including when a request is cancelled.
struct RecomputeSlot<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    id: String,
    lock: Option<Arc<Mutex<()>>>,
}

impl<'a> RecomputeSlot<'a> {
    fn acquire(locks: &'a DashMap<String, Arc<Mutex<()>>>, id: &str) -> Self {
        let lock = locks.entry(id.to_string()).or_default().clone();
        Self {
            locks,
            id: id.to_string(),
            lock: Some(lock),
        }
    }

    async fn lock(&self) -> Option<MutexGuard<'_, ()>> {
        Some(self.lock.as_ref()?.lock().await)
    }
}

impl Drop for RecomputeSlot<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Lowercase hyphenated form of a valid scan id. Anything else never
/// reaches the filesystem.
fn canonical_id(id: &str) -> Option<String> {
    Uuid::parse_str(id).ok().map(|u| u.hyphenated().to_string())
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|e| Error::preprocessing(format!("failed to encode JPEG: {}", e)))?;
    Ok(buf)
}

fn storage_error(err: object_store::Error) -> Error {
    tracing::error!("Object store error: {:?}", err);
    Error::Io(std::io::Error::other(err))
}
