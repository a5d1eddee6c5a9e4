use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, Participant};
use profile_cell::models::ProfileError;
use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const RECORDS_PER_PAGE: usize = 10;

pub const RECORD_EMBED: &str = "*,patient:patients(id,user_id,user:users(username,first_name,last_name)),doctor:doctors(id,user_id,user:users(username,first_name,last_name))";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    #[default]
    Diagnosis,
    Prescription,
    LabReport,
    Imaging,
    Procedure,
    Progress,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub record_type: RecordType,
    pub title: String,
    pub diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub prescription: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub document_url: Option<String>,
    #[serde(default)]
    pub is_shared: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Participant>,
}

impl MedicalRecord {
    pub fn patient_user_id(&self) -> Option<Uuid> {
        self.patient.as_ref().map(|p| p.user_id)
    }

    pub fn doctor_user_id(&self) -> Option<Uuid> {
        self.doctor.as_ref().map(|d| d.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub medicines: Value,
    pub instructions: String,
    pub refill_info: Option<String>,
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub is_digital: bool,
    pub digital_signature: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMedicalRecordRequest {
    pub record_type: Option<RecordType>,
    pub title: Option<String>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub prescription: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub document_url: Option<String>,
    pub is_shared: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub medicines: Value,
    pub instructions: String,
    pub refill_info: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

/// Which records a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    Patient(Uuid),
    Doctor(Uuid),
    All,
}

pub fn default_title(date: NaiveDate) -> String {
    format!("Consultation on {}", date)
}

/// Medicines are a non-empty list of objects, each naming the medicine.
pub fn validate_medicines(medicines: &Value) -> Result<(), String> {
    let list = medicines
        .as_array()
        .ok_or_else(|| "Medicines must be a JSON list.".to_string())?;
    if list.is_empty() {
        return Err("At least one medicine is required.".to_string());
    }
    for (i, medicine) in list.iter().enumerate() {
        let named = medicine
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty());
        if !named {
            return Err(format!("Medicine #{} needs a name.", i + 1));
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum MedicalRecordError {
    #[error("Medical record not found")]
    NotFound,

    #[error("You do not have permission to view this record.")]
    NotPermitted,

    #[error("A medical record for this appointment already exists.")]
    AlreadyExists,

    #[error("This record already has a prescription.")]
    PrescriptionExists,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<MedicalRecordError> for AppError {
    fn from(err: MedicalRecordError) -> Self {
        match err {
            MedicalRecordError::NotFound => AppError::NotFound(err.to_string()),
            MedicalRecordError::NotPermitted => AppError::Forbidden(err.to_string()),
            MedicalRecordError::AlreadyExists | MedicalRecordError::PrescriptionExists => {
                AppError::Conflict(err.to_string())
            }
            MedicalRecordError::Validation(msg) => AppError::ValidationError(msg),
            MedicalRecordError::Appointment(e) => e.into(),
            MedicalRecordError::Profile(e) => e.into(),
            MedicalRecordError::Database(e) => e.into(),
        }
    }
}
