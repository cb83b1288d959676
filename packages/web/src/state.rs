use neuroscan_model::ModelHandle;
use neuroscan_storage::ScanStore;
use std::sync::Arc;

pub type AppState = Arc<State>;

/// Default request body cap for scan uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application context built once at startup and shared with every handler.
#[derive(Debug)]
pub struct State {
    /// Loaded once, read-only afterwards. Swapping models needs a restart.
    pub model: ModelHandle,
    pub store: Arc<ScanStore>,
    pub max_upload_bytes: usize,
}

impl State {
    pub fn new(model: ModelHandle, store: Arc<ScanStore>) -> Self {
        Self {
            model,
            store,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
