use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::validation::FieldErrors;

use crate::models::{ClinicUser, ProfileError};
use crate::services::{ProfileService, UserService};

/// Columns of a new `users` row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Creates the `users` row and its profile for a freshly created auth user.
pub struct AccountProvisioner {
    users: UserService,
    profiles: ProfileService,
}

impl AccountProvisioner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            users: UserService::new(config),
            profiles: ProfileService::new(config),
        }
    }

    /// Record username/email collisions the way the signup form does.
    pub async fn check_unique(
        &self,
        username: &str,
        email: &str,
        errors: &mut FieldErrors,
        auth_token: Option<&str>,
    ) -> Result<(), ProfileError> {
        if self.users.find_by_username(username, auth_token).await?.is_some() {
            errors.add("username", "A user with that username already exists.");
        }
        if self.users.find_by_email(email, auth_token).await?.is_some() {
            errors.add("email", "This email address is already in use.");
        }
        Ok(())
    }

    pub async fn provision(
        &self,
        auth_user_id: Uuid,
        account: NewAccount,
        auth_token: Option<&str>,
    ) -> Result<ClinicUser, ProfileError> {
        let row = json!({
            "id": auth_user_id,
            "username": account.username,
            "email": account.email,
            "first_name": account.first_name,
            "last_name": account.last_name,
            "role": account.role,
            "phone": account.phone,
            "is_verified": false,
            "is_active": true,
            "date_joined": Utc::now().to_rfc3339(),
        });

        let user = self.users.create(row, auth_token).await?;
        self.profiles.create_for_user(user.id, auth_token).await?;

        info!("Provisioned {} account {}", user.role, user.username);
        Ok(user)
    }
}
