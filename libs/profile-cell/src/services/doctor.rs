use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Doctor, ProfileError};

/// Row-level access to `doctors` for the doctor's own account. Listing and
/// scheduling live in the doctor cell.
pub struct DoctorProfileService {
    supabase: SupabaseClient,
}

impl DoctorProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_by_user(&self, user_id: Uuid, auth_token: &str) -> Result<Option<Doctor>, ProfileError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    pub async fn get(&self, doctor_id: Uuid, auth_token: &str) -> Result<Doctor, ProfileError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(ProfileError::DoctorNotFound)
    }

    pub async fn create(&self, row: Value, auth_token: Option<&str>) -> Result<Doctor, ProfileError> {
        Ok(self
            .supabase
            .insert("doctors", row, self.supabase.privileged_token(auth_token))
            .await?)
    }

    /// Doctor accounts start with placeholder practice details that the
    /// doctor fills in from their profile.
    pub async fn create_placeholder_for_user(&self, user_id: Uuid, auth_token: Option<&str>) -> Result<Doctor, ProfileError> {
        debug!("Creating placeholder doctor record for user {}", user_id);
        self.create(placeholder_row(user_id), auth_token).await
    }

    pub async fn get_or_create_for_user(&self, user_id: Uuid, auth_token: &str) -> Result<Doctor, ProfileError> {
        match self.get_by_user(user_id, auth_token).await? {
            Some(doctor) => Ok(doctor),
            None => self.create_placeholder_for_user(user_id, Some(auth_token)).await,
        }
    }

    pub async fn update(
        &self,
        doctor_id: Uuid,
        mut changes: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Doctor, ProfileError> {
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let rows: Vec<Doctor> = self
            .supabase
            .update(&path, Value::Object(changes), Some(auth_token))
            .await?;
        rows.into_iter().next().ok_or(ProfileError::DoctorNotFound)
    }

    /// Replace the doctor's specialization links.
    pub async fn set_specializations(
        &self,
        doctor_id: Uuid,
        specialization_ids: &[Uuid],
        auth_token: Option<&str>,
    ) -> Result<(), ProfileError> {
        let token = self.supabase.privileged_token(auth_token);
        let path = format!("/rest/v1/doctor_specializations?doctor_id=eq.{}", doctor_id);
        self.supabase.delete(&path, token).await?;

        if specialization_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<Value> = specialization_ids
            .iter()
            .map(|id| json!({ "doctor_id": doctor_id, "specialization_id": id }))
            .collect();
        let _: Vec<Value> = self
            .supabase
            .insert_many("doctor_specializations", rows, token)
            .await?;
        Ok(())
    }
}

fn placeholder_row(user_id: Uuid) -> Value {
    json!({
        "user_id": user_id,
        "experience_years": 0,
        "consultation_fee": 0.0,
        "license_number": format!("temp-license-{}", user_id),
        "clinic_address": "temp address",
        "available_days": "",
        "available_from": "09:00:00",
        "available_to": "17:00:00",
        "is_active": true,
        "education": "",
        "languages": "English",
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_license_is_unique_per_user() {
        let id = Uuid::new_v4();
        let row = placeholder_row(id);
        assert_eq!(row["license_number"], format!("temp-license-{}", id));
        assert_eq!(row["available_from"], "09:00:00");
    }
}
