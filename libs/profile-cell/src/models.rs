use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::auth::Role;
use shared_models::error::AppError;

pub const BLOOD_GROUPS: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
pub const WEEK_DAYS: &[&str] = &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const MAX_BIO_LEN: usize = 500;

// ==============================================================================
// ACCOUNT ROWS
// ==============================================================================

/// Row of the `users` table. `id` equals the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl ClinicUser {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name, &self.username)
    }
}

/// Name columns embedded from `users` in joined selects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserName {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserName {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name, &self.username)
    }

    /// Case-insensitive match on first or last name.
    pub fn matches_name(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.first_name.to_lowercase().contains(&needle) || self.last_name.to_lowercase().contains(&needle)
    }
}

fn full_name(first: &str, last: &str, fallback: &str) -> String {
    let name = format!("{} {}", first.trim(), last.trim());
    let name = name.trim();
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub profile_picture_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Whole years since the date of birth, counting the birthday itself.
    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        if dob > today {
            return None;
        }
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub age: Option<u32>,
}

impl ProfileView {
    pub fn new(profile: Profile, today: NaiveDate) -> Self {
        let age = profile.age(today);
        Self { profile, age }
    }
}

// ==============================================================================
// ROLE ROWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub blood_group: Option<String>,
    /// Centimetres.
    pub height: Option<f64>,
    /// Kilograms.
    pub weight: Option<f64>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
}

impl Patient {
    pub fn bmi(&self) -> Option<f64> {
        match (self.height, self.weight) {
            (Some(height), Some(weight)) if height > 0.0 => {
                let metres = height / 100.0;
                Some((weight / (metres * metres) * 100.0).round() / 100.0)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientView {
    #[serde(flatten)]
    pub patient: Patient,
    pub bmi: Option<f64>,
}

impl From<Patient> for PatientView {
    fn from(patient: Patient) -> Self {
        let bmi = patient.bmi();
        Self { patient, bmi }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub experience_years: i32,
    pub consultation_fee: f64,
    pub license_number: String,
    pub clinic_address: String,
    #[serde(default)]
    pub available_days: String,
    pub available_from: NaiveTime,
    pub available_to: NaiveTime,
    pub is_active: bool,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub languages: String,
    pub awards: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientFields {
    pub blood_group: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctorFields {
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<f64>,
    pub license_number: Option<String>,
    pub clinic_address: Option<String>,
    pub available_days: Option<Vec<String>>,
    pub available_from: Option<NaiveTime>,
    pub available_to: Option<NaiveTime>,
    pub education: Option<String>,
    pub languages: Option<String>,
    pub awards: Option<String>,
    pub specialization_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub profile_picture_url: Option<String>,
    pub patient: Option<UpdatePatientFields>,
    pub doctor: Option<UpdateDoctorFields>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("User not found")]
    UserNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::UserNotFound
            | ProfileError::PatientNotFound
            | ProfileError::DoctorNotFound => AppError::NotFound(err.to_string()),
            ProfileError::Validation(msg) => AppError::ValidationError(msg),
            ProfileError::Database(e) => e.into(),
        }
    }
}
