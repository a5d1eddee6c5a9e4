use serde::{Deserialize, Serialize};

use profile_cell::models::{ClinicUser, ProfileError};
use shared_database::{AuthSession, DatabaseError};
use shared_models::auth::Role;
use shared_models::error::AppError;

pub const USERS_PER_PAGE: usize = 15;
pub const SUPPORTED_OAUTH_PROVIDERS: &[&str] = &["google"];

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthQuery {
    pub provider: Option<String>,
}

/// What a successful sign-in hands back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub session: AuthSession,
    pub user: ClinicUser,
    pub redirect_to: &'static str,
}

impl LoginResponse {
    pub fn new(session: AuthSession, user: ClinicUser) -> Self {
        let redirect_to = user.role.dashboard_path();
        Self {
            session,
            user,
            redirect_to,
        }
    }
}

/// Roles a visitor may pick when signing up. Admins are created out of band.
pub fn self_service_role(raw: Option<&str>) -> Result<Role, AuthError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(Role::Patient),
        Some(text) => match text.parse::<Role>() {
            Ok(role @ (Role::Patient | Role::Doctor)) => Ok(role),
            _ => Err(AuthError::Validation(format!(
                "role: Select a valid choice. {} is not one of the available choices.",
                text
            ))),
        },
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username, password, or role.")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("Unsupported sign-in provider: {0}")]
    UnsupportedProvider(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::Validation(msg) => AppError::ValidationError(msg),
            AuthError::UnsupportedProvider(_) => AppError::BadRequest(err.to_string()),
            AuthError::Profile(e) => e.into(),
            AuthError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn signup_role_defaults_to_patient() {
        assert_eq!(self_service_role(None).unwrap(), Role::Patient);
        assert_eq!(self_service_role(Some("  ")).unwrap(), Role::Patient);
        assert_eq!(self_service_role(Some("Doctor")).unwrap(), Role::Doctor);
    }

    #[test]
    fn signup_cannot_pick_admin() {
        assert_matches!(self_service_role(Some("admin")), Err(AuthError::Validation(msg)) if msg.starts_with("role:"));
        assert_matches!(self_service_role(Some("nurse")), Err(AuthError::Validation(_)));
    }

    #[test]
    fn bad_credentials_are_unauthorized() {
        let err: AppError = AuthError::InvalidCredentials.into();
        assert_matches!(err, AppError::Auth(msg) if msg == "Invalid username, password, or role.");
    }
}
