use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;

pub fn require_role(user: &User, allowed: &[Role]) -> Result<Role, AppError> {
    match user.clinic_role() {
        Some(role) if allowed.contains(&role) => Ok(role),
        _ => Err(AppError::Forbidden(format!(
            "This action requires one of the roles: {}",
            allowed.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
        ))),
    }
}

pub fn require_patient(user: &User) -> Result<(), AppError> {
    require_role(user, &[Role::Patient]).map(|_| ())
}

pub fn require_doctor(user: &User) -> Result<(), AppError> {
    require_role(user, &[Role::Doctor]).map(|_| ())
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    require_role(user, &[Role::Admin]).map(|_| ())
}

pub fn require_doctor_or_admin(user: &User) -> Result<Role, AppError> {
    require_role(user, &[Role::Doctor, Role::Admin])
}

pub fn require_any_role(user: &User) -> Result<Role, AppError> {
    user.clinic_role()
        .ok_or_else(|| AppError::Forbidden("Your user role is not configured".to_string()))
}

pub fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user id in token".to_string()))
}
