use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::Appointment;
use notification_cell::{NewNotification, NotificationService, NotificationType};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_utils::validation::{has_allowed_extension, DOCUMENT_EXTENSIONS};

use crate::models::{
    default_title, validate_medicines, CreateMedicalRecordRequest, CreatePrescriptionRequest, MedicalRecord,
    MedicalRecordError, Prescription, RecordScope, RECORD_EMBED,
};

/// Patients read their own records, doctors the ones they wrote, admins all.
pub fn ensure_can_view(record: &MedicalRecord, user_id: Uuid, role: Role) -> Result<(), MedicalRecordError> {
    let allowed = match role {
        Role::Admin => true,
        Role::Patient => record.patient_user_id() == Some(user_id),
        Role::Doctor => record.doctor_user_id() == Some(user_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(MedicalRecordError::NotPermitted)
    }
}

pub struct MedicalRecordService {
    supabase: SupabaseClient,
    notifications: NotificationService,
}

impl MedicalRecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            notifications: NotificationService::new(config),
        }
    }

    pub async fn get(&self, record_id: Uuid, auth_token: &str) -> Result<MedicalRecord, MedicalRecordError> {
        let path = format!("/rest/v1/medical_records?id=eq.{}&select={}", record_id, RECORD_EMBED);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(MedicalRecordError::NotFound)
    }

    pub async fn list(&self, scope: RecordScope, auth_token: &str) -> Result<Vec<MedicalRecord>, MedicalRecordError> {
        let filter = match scope {
            RecordScope::Patient(id) => format!("patient_id=eq.{}&", id),
            RecordScope::Doctor(id) => format!("doctor_id=eq.{}&", id),
            RecordScope::All => String::new(),
        };
        let path = format!(
            "/rest/v1/medical_records?{}select={}&order=created_at.desc",
            filter, RECORD_EMBED
        );
        Ok(self.supabase.select(&path, Some(auth_token)).await?)
    }

    pub async fn recent_for_patient(
        &self,
        patient_id: Uuid,
        limit: usize,
        auth_token: &str,
    ) -> Result<Vec<MedicalRecord>, MedicalRecordError> {
        let path = format!(
            "/rest/v1/medical_records?patient_id=eq.{}&select={}&order=created_at.desc&limit={}",
            patient_id, RECORD_EMBED, limit
        );
        Ok(self.supabase.select(&path, Some(auth_token)).await?)
    }

    pub async fn for_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<MedicalRecord>, MedicalRecordError> {
        let path = format!("/rest/v1/medical_records?appointment_id=eq.{}&select=*", appointment_id);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    /// Write the record for `appointment`. The caller has already checked
    /// that the signed-in doctor is the appointment's doctor.
    pub async fn create(
        &self,
        appointment: &Appointment,
        request: CreateMedicalRecordRequest,
        auth_token: &str,
    ) -> Result<MedicalRecord, MedicalRecordError> {
        debug!("Creating medical record for appointment {}", appointment.appointment_number);

        if self.for_appointment(appointment.id, auth_token).await?.is_some() {
            return Err(MedicalRecordError::AlreadyExists);
        }

        if let Some(url) = request.document_url.as_deref() {
            if !has_allowed_extension(url, DOCUMENT_EXTENSIONS) {
                return Err(MedicalRecordError::Validation(format!(
                    "document: allowed file types are {}",
                    DOCUMENT_EXTENSIONS.join(", ")
                )));
            }
        }

        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_title(appointment.appointment_date));

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "patient_id": appointment.patient_id,
            "doctor_id": appointment.doctor_id,
            "appointment_id": appointment.id,
            "record_type": request.record_type.unwrap_or_default(),
            "title": title,
            "diagnosis": request.diagnosis,
            "symptoms": request.symptoms,
            "prescription": request.prescription,
            "treatment": request.treatment,
            "notes": request.notes,
            "document_url": request.document_url,
            "is_shared": request.is_shared.unwrap_or(false),
            "created_at": now,
            "updated_at": now,
        });

        // One record per appointment is also enforced by a unique index.
        let mut record: MedicalRecord = self
            .supabase
            .insert("medical_records", row, Some(auth_token))
            .await
            .map_err(|e| if e.is_conflict() { MedicalRecordError::AlreadyExists } else { e.into() })?;
        info!("Medical record {} created for appointment {}", record.id, appointment.appointment_number);

        record.patient = appointment.patient.clone();
        record.doctor = appointment.doctor.clone();

        if let Some(patient_user) = appointment.patient_user_id() {
            let notice = NewNotification::new(
                patient_user,
                NotificationType::Appointment,
                "New medical record",
                format!("Dr. {} added a medical record: {}", appointment.doctor_name(), record.title),
            )
            .related(record.id, "medical_record")
            .with_action_url(format!("/medical-records/{}", record.id));
            self.notifications.notify_all(vec![notice], auth_token).await;
        }

        Ok(record)
    }

    pub async fn prescription_for(
        &self,
        record_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Prescription>, MedicalRecordError> {
        let path = format!("/rest/v1/prescriptions?medical_record_id=eq.{}", record_id);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    pub async fn create_prescription(
        &self,
        record: &MedicalRecord,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, MedicalRecordError> {
        validate_medicines(&request.medicines).map_err(MedicalRecordError::Validation)?;
        if request.instructions.trim().is_empty() {
            return Err(MedicalRecordError::Validation(
                "instructions: This field is required.".to_string(),
            ));
        }

        if self.prescription_for(record.id, auth_token).await?.is_some() {
            return Err(MedicalRecordError::PrescriptionExists);
        }

        let row = json!({
            "medical_record_id": record.id,
            "medicines": request.medicines,
            "instructions": request.instructions.trim(),
            "refill_info": request.refill_info,
            "valid_until": request.valid_until,
            "is_digital": true,
            "created_at": Utc::now().to_rfc3339(),
        });
        let prescription: Prescription = self
            .supabase
            .insert("prescriptions", row, Some(auth_token))
            .await
            .map_err(|e| if e.is_conflict() { MedicalRecordError::PrescriptionExists } else { e.into() })?;
        info!("Prescription {} issued for record {}", prescription.id, record.id);

        if let Some(patient_user) = record.patient_user_id() {
            let notice = NewNotification::new(
                patient_user,
                NotificationType::Prescription,
                "New prescription",
                format!("A prescription was added to your record: {}", record.title),
            )
            .related(record.id, "medical_record")
            .with_action_url(format!("/medical-records/{}", record.id));
            self.notifications.notify_all(vec![notice], auth_token).await;
        }

        Ok(prescription)
    }
}
