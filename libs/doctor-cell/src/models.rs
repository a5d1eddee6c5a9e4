use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use profile_cell::models::{Doctor, ProfileError, UserName};
use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const DOCTORS_PER_PAGE: usize = 10;

pub const DAY_NAMES: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

// ==============================================================================
// SPECIALIZATIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSpecializationRequest {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Lowercase ASCII words joined by hyphens.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorUser {
    #[serde(flatten)]
    pub name: UserName,
    #[serde(default)]
    pub email: String,
}

/// A `doctors` row with its user and specializations embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorWithUser {
    #[serde(flatten)]
    pub doctor: Doctor,
    #[serde(default)]
    pub user: DoctorUser,
    #[serde(default)]
    pub specializations: Vec<Specialization>,
}

impl DoctorWithUser {
    pub fn full_name(&self) -> String {
        self.user.name.full_name()
    }

    /// Filter value may be a specialization id or slug.
    pub fn has_specialization(&self, wanted: &str) -> bool {
        self.specializations
            .iter()
            .any(|s| s.slug.eq_ignore_ascii_case(wanted) || s.id.to_string() == wanted)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorSummary {
    #[serde(flatten)]
    pub doctor: DoctorWithUser,
    pub full_name: String,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorListQuery {
    pub specialization: Option<String>,
    pub name: Option<String>,
    pub min_experience: Option<i32>,
    pub max_fee: Option<f64>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddDoctorRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub specialization_id: Uuid,
    pub license_number: String,
    pub experience_years: i32,
    pub consultation_fee: f64,
    pub clinic_address: String,
}

// ==============================================================================
// REVIEWS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewPatient {
    #[serde(default)]
    pub user: UserName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub doctor_response: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub patient: Option<ReviewPatient>,
}

impl Review {
    /// Name shown next to the review.
    pub fn reviewer_name(&self) -> String {
        if self.is_anonymous {
            return "Anonymous".to_string();
        }
        self.patient
            .as_ref()
            .map(|p| p.user.full_name())
            .unwrap_or_else(|| "Patient".to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub reviewer_name: String,
}

impl From<Review> for ReviewView {
    fn from(review: Review) -> Self {
        let reviewer_name = review.reviewer_name();
        Self { review, reviewer_name }
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    #[serde(default)]
    pub recurring: bool,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DoctorAvailability {
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && self.valid_to.map_or(true, |to| to >= date)
    }

    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < self.end_time && end > self.start_time
    }

    /// Inclusive of both ends, as rescheduling checks it.
    pub fn covers(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }

    pub fn day_name(&self) -> &'static str {
        usize::try_from(self.day_of_week)
            .ok()
            .and_then(|d| DAY_NAMES.get(d).copied())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: Option<bool>,
    pub recurring: Option<bool>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    /// `HH:MM`, 24-hour.
    pub start: String,
    /// `hh:MM AM`.
    pub formatted: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSlotQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Availability not found")]
    AvailabilityNotFound,

    #[error("Specialization not found")]
    SpecializationNotFound,

    #[error("This time slot overlaps with an existing schedule.")]
    OverlappingAvailability,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound
            | DoctorError::AvailabilityNotFound
            | DoctorError::SpecializationNotFound => AppError::NotFound(err.to_string()),
            DoctorError::OverlappingAvailability => AppError::Conflict(err.to_string()),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::Conflict(msg) => AppError::Conflict(msg),
            DoctorError::Profile(ProfileError::DoctorNotFound) => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::Profile(e) => e.into(),
            DoctorError::Database(e) => e.into(),
        }
    }
}
