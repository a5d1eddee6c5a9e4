use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;

use crate::models::{ClinicUser, ProfileError};

pub struct UserService {
    supabase: SupabaseClient,
}

impl UserService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get(&self, user_id: Uuid, auth_token: &str) -> Result<ClinicUser, ProfileError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(ProfileError::UserNotFound)
    }

    pub async fn find_by_username(&self, username: &str, auth_token: Option<&str>) -> Result<Option<ClinicUser>, ProfileError> {
        let path = format!("/rest/v1/users?username=eq.{}", urlencode(username));
        Ok(self.supabase.select_one(&path, self.supabase.privileged_token(auth_token)).await?)
    }

    /// Email match is case-insensitive, like the login form.
    pub async fn find_by_email(&self, email: &str, auth_token: Option<&str>) -> Result<Option<ClinicUser>, ProfileError> {
        let path = format!("/rest/v1/users?email=ilike.{}", urlencode(&like_literal(email)));
        let candidates: Vec<ClinicUser> = self
            .supabase
            .select(&path, self.supabase.privileged_token(auth_token))
            .await?;
        Ok(candidates.into_iter().find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    pub async fn create(&self, row: Value, auth_token: Option<&str>) -> Result<ClinicUser, ProfileError> {
        debug!("Creating users row");
        Ok(self
            .supabase
            .insert("users", row, self.supabase.privileged_token(auth_token))
            .await?)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        changes: Map<String, Value>,
        auth_token: &str,
    ) -> Result<ClinicUser, ProfileError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let rows: Vec<ClinicUser> = self
            .supabase
            .update(&path, Value::Object(changes), Some(auth_token))
            .await?;
        rows.into_iter().next().ok_or(ProfileError::UserNotFound)
    }

    /// Everyone, newest first. Admin listing filters and pages in memory.
    pub async fn list_all(&self, auth_token: &str) -> Result<Vec<ClinicUser>, ProfileError> {
        Ok(self
            .supabase
            .select("/rest/v1/users?order=date_joined.desc", Some(auth_token))
            .await?)
    }

    pub async fn count_by_role(&self, role: Role, auth_token: &str) -> Result<usize, ProfileError> {
        let path = format!("/rest/v1/users?role=eq.{}&select=id", role);
        Ok(self.supabase.count(&path, Some(auth_token)).await?)
    }
}

/// Escape LIKE wildcards so `value` only matches itself.
fn like_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn urlencode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Case-insensitive search over username, email and names.
pub fn user_matches(user: &ClinicUser, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    [&user.username, &user.email, &user.first_name, &user.last_name]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn search_covers_names_and_email() {
        let user = ClinicUser {
            id: Uuid::new_v4(),
            username: "jdoe".into(),
            email: "jane@clinic.org".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            role: Role::Patient,
            phone: None,
            is_verified: false,
            is_active: true,
            date_joined: Utc::now(),
        };
        assert!(user_matches(&user, "JANE"));
        assert!(user_matches(&user, "clinic.org"));
        assert!(user_matches(&user, "doe"));
        assert!(!user_matches(&user, "smith"));
    }

    #[test]
    fn email_wildcards_are_escaped() {
        assert_eq!(like_literal("jane_doe@x.org"), r"jane\_doe@x.org");
        assert_eq!(like_literal("100%*@x.org"), r"100\%\*@x.org");
        assert_eq!(like_literal("plain@x.org"), "plain@x.org");
    }
}
