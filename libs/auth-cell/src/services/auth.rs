use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use profile_cell::models::ClinicUser;
use profile_cell::services::{AccountProvisioner, DoctorProfileService, NewAccount, PatientService, UserService};
use shared_config::AppConfig;
use shared_database::{AuthSession, DatabaseError, SupabaseClient};
use shared_models::auth::Role;
use shared_utils::validation::{password_issues, validate_email, validate_phone, validate_username, FieldErrors};

use crate::models::{
    self_service_role, AuthError, ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
    SUPPORTED_OAUTH_PROVIDERS,
};

fn into_validation(errors: FieldErrors) -> Result<(), AuthError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors.messages().join("; ")))
    }
}

/// Field checks that need no database access.
pub fn validate_registration(request: &RegisterRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check(
        validate_username(&request.username),
        "username",
        "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
    );
    errors.check(validate_email(&request.email), "email", "Enter a valid email address.");
    errors.check(!request.first_name.trim().is_empty(), "first_name", "This field is required.");
    errors.check(!request.last_name.trim().is_empty(), "last_name", "This field is required.");
    if let Some(phone) = request.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        errors.check(
            validate_phone(phone),
            "phone",
            "Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.",
        );
    }
    errors.check(
        request.password == request.password_confirmation,
        "password_confirmation",
        "The two password fields didn't match.",
    );
    for issue in password_issues(&request.password, &request.username, &request.email) {
        errors.add("password", issue);
    }
    errors
}

pub struct AuthService {
    supabase: SupabaseClient,
    users: UserService,
    accounts: AccountProvisioner,
    patients: PatientService,
    doctors: DoctorProfileService,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            users: UserService::new(config),
            accounts: AccountProvisioner::new(config),
            patients: PatientService::new(config),
            doctors: DoctorProfileService::new(config),
        }
    }

    /// Sign up a patient or doctor: auth user, `users` row, profile and
    /// the role record.
    pub async fn register(&self, request: RegisterRequest) -> Result<(ClinicUser, Option<AuthSession>), AuthError> {
        debug!("Registering {}", request.username);

        let role = self_service_role(request.role.as_deref())?;
        let mut errors = validate_registration(&request);
        self.accounts
            .check_unique(&request.username, &request.email, &mut errors, None)
            .await?;
        into_validation(errors)?;

        let metadata = json!({ "role": role, "username": request.username });
        let (auth_user, session) = self
            .supabase
            .sign_up(&request.email, &request.password, metadata)
            .await?;
        let user_id = Uuid::parse_str(&auth_user.id).map_err(|_| {
            DatabaseError::Api {
                status: 500,
                message: format!("Auth user id is not a UUID: {}", auth_user.id),
            }
        })?;

        let account = NewAccount {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            role,
            phone: request.phone.filter(|p| !p.trim().is_empty()),
        };
        let user = self.accounts.provision(user_id, account, None).await?;

        match role {
            Role::Patient => {
                self.patients.create_for_user(user_id, None).await?;
            }
            Role::Doctor => {
                self.doctors.create_placeholder_for_user(user_id, None).await?;
            }
            Role::Admin => {}
        }

        info!("Registered {} {}", role, user.username);
        Ok((user, session))
    }

    /// Password sign-in by username. The account's role must be the one
    /// the user picked on the form.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let role: Role = request.role.parse().map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .find_by_username(request.username.trim(), None)
            .await?
            .filter(|u| u.is_active && u.role == role)
            .ok_or(AuthError::InvalidCredentials)?;

        let session = match self.supabase.sign_in_with_password(&user.email, &request.password).await {
            Ok(session) => session,
            Err(DatabaseError::Unauthorized(_)) | Err(DatabaseError::Api { status: 400, .. }) => {
                warn!("Failed sign-in for {}", user.username);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        info!("{} {} signed in", user.role, user.username);
        Ok(LoginResponse::new(session, user))
    }

    pub async fn logout(&self, auth_token: &str) -> Result<(), AuthError> {
        self.supabase.sign_out(auth_token).await?;
        Ok(())
    }

    /// Re-check the old password, then set the new one on the session.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
        auth_token: &str,
    ) -> Result<(), AuthError> {
        let user = self.users.get(user_id, auth_token).await?;

        let mut errors = FieldErrors::new();
        errors.check(
            request.new_password == request.new_password_confirmation,
            "new_password_confirmation",
            "The two password fields didn't match.",
        );
        for issue in password_issues(&request.new_password, &user.username, &user.email) {
            errors.add("new_password", issue);
        }
        into_validation(errors)?;

        if self
            .supabase
            .sign_in_with_password(&user.email, &request.old_password)
            .await
            .is_err()
        {
            return Err(AuthError::Validation(
                "old_password: Your old password was entered incorrectly. Please enter it again.".to_string(),
            ));
        }

        self.supabase.update_password(auth_token, &request.new_password).await?;
        info!("Password changed for {}", user.username);
        Ok(())
    }

    pub fn oauth_url(&self, provider: &str, redirect_to: &str) -> Result<String, AuthError> {
        let provider = provider.trim().to_ascii_lowercase();
        if !SUPPORTED_OAUTH_PROVIDERS.contains(&provider.as_str()) {
            return Err(AuthError::UnsupportedProvider(provider));
        }
        Ok(self.supabase.oauth_authorize_url(&provider, redirect_to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: "jdoe".into(),
            email: "jane@example.com".into(),
            password: "Blue-Harbor-77".into(),
            password_confirmation: "Blue-Harbor-77".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            role: None,
            phone: Some("+15551234567".into()),
        }
    }

    #[test]
    fn clean_registration_passes() {
        assert!(validate_registration(&request()).is_empty());
    }

    #[test]
    fn mismatched_and_weak_passwords_are_reported() {
        let mut req = request();
        req.password = "12345678".into();
        let errors = validate_registration(&req);
        let joined = errors.messages().join("; ");
        assert!(joined.contains("password_confirmation:"));
        assert!(joined.contains("entirely numeric"));
    }

    #[test]
    fn password_like_username_is_rejected() {
        let mut req = request();
        req.password = "jdoe2024!".into();
        req.password_confirmation = req.password.clone();
        assert!(validate_registration(&req)
            .messages()
            .iter()
            .any(|m| m.contains("too similar")));
    }

    #[test]
    fn names_are_required() {
        let mut req = request();
        req.first_name = " ".into();
        assert!(validate_registration(&req)
            .messages()
            .iter()
            .any(|m| m.starts_with("first_name:")));
    }
}
