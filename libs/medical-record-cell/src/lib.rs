pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{MedicalRecord, MedicalRecordError, Prescription, RecordType};
pub use services::MedicalRecordService;
