/// Serialized scan records and patient metadata
pub mod record;
/// Image and record persistence with lazy recomputation
pub mod store;

pub use record::{PatientInfo, ScanRecord, image_url, parse_patient_info};
pub use store::ScanStore;

pub use object_store;
