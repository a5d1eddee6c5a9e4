use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Profile, ProfileError};

pub struct ProfileService {
    supabase: SupabaseClient,
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_by_user(&self, user_id: Uuid, auth_token: &str) -> Result<Option<Profile>, ProfileError> {
        let path = format!("/rest/v1/profiles?user_id=eq.{}", user_id);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    /// Every user has exactly one profile; it is created with the user and
    /// recreated here if it went missing.
    pub async fn create_for_user(&self, user_id: Uuid, auth_token: Option<&str>) -> Result<Profile, ProfileError> {
        debug!("Creating profile for user {}", user_id);

        let row = json!({
            "user_id": user_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });
        Ok(self
            .supabase
            .insert("profiles", row, self.supabase.privileged_token(auth_token))
            .await?)
    }

    pub async fn get_or_create(&self, user_id: Uuid, auth_token: &str) -> Result<Profile, ProfileError> {
        match self.get_by_user(user_id, auth_token).await? {
            Some(profile) => Ok(profile),
            None => self.create_for_user(user_id, Some(auth_token)).await,
        }
    }

    pub async fn update(
        &self,
        profile_id: Uuid,
        mut changes: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Profile, ProfileError> {
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/profiles?id=eq.{}", profile_id);
        let rows: Vec<Profile> = self
            .supabase
            .update(&path, Value::Object(changes), Some(auth_token))
            .await?;
        rows.into_iter().next().ok_or(ProfileError::UserNotFound)
    }
}
