use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Patient, ProfileError};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_by_user(&self, user_id: Uuid, auth_token: &str) -> Result<Option<Patient>, ProfileError> {
        let path = format!("/rest/v1/patients?user_id=eq.{}", user_id);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    pub async fn get(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, ProfileError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(ProfileError::PatientNotFound)
    }

    pub async fn create_for_user(&self, user_id: Uuid, auth_token: Option<&str>) -> Result<Patient, ProfileError> {
        debug!("Creating patient record for user {}", user_id);
        Ok(self
            .supabase
            .insert("patients", json!({ "user_id": user_id }), self.supabase.privileged_token(auth_token))
            .await?)
    }

    /// The patient row of a patient-role user, created on first use.
    pub async fn get_or_create_for_user(&self, user_id: Uuid, auth_token: &str) -> Result<Patient, ProfileError> {
        match self.get_by_user(user_id, auth_token).await? {
            Some(patient) => Ok(patient),
            None => self.create_for_user(user_id, Some(auth_token)).await,
        }
    }

    pub async fn update(
        &self,
        patient_id: Uuid,
        changes: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Patient, ProfileError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let rows: Vec<Patient> = self
            .supabase
            .update(&path, Value::Object(changes), Some(auth_token))
            .await?;
        rows.into_iter().next().ok_or(ProfileError::PatientNotFound)
    }
}
