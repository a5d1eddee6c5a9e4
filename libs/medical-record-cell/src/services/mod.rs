pub mod record;

pub use record::{ensure_can_view, MedicalRecordService};
