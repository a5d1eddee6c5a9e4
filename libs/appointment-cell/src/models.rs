use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use profile_cell::models::{ProfileError, UserName};
use shared_database::DatabaseError;
use shared_models::error::AppError;

/// PostgREST select that embeds both participants with their names.
pub const APPOINTMENT_EMBED: &str = "*,patient:patients(id,user_id,user:users(username,first_name,last_name)),doctor:doctors(id,user_id,consultation_fee,user:users(username,first_name,last_name))";

// ==============================================================================
// STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Rescheduled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
        AppointmentStatus::Rescheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Rescheduled => "Rescheduled",
        }
    }

    /// Holds its slot.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Rescheduled
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| AppointmentError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

/// Patient or doctor row embedded in an appointment select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub user: UserName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_number: String,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub payment_status: AppointmentPaymentStatus,
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_reminder_sent: bool,
    pub cancellation_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Participant>,
}

impl Appointment {
    pub fn patient_user_id(&self) -> Option<Uuid> {
        self.patient.as_ref().map(|p| p.user_id)
    }

    pub fn doctor_user_id(&self) -> Option<Uuid> {
        self.doctor.as_ref().map(|d| d.user_id)
    }

    pub fn doctor_name(&self) -> String {
        self.doctor
            .as_ref()
            .map(|d| d.user.full_name())
            .unwrap_or_else(|| "Doctor".to_string())
    }

    /// Case-insensitive match on participant names or the appointment number.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle_lower = needle.to_lowercase();
        self.appointment_number.to_lowercase().contains(&needle_lower)
            || self.patient.as_ref().is_some_and(|p| p.user.matches_name(needle))
            || self.doctor.as_ref().is_some_and(|d| d.user.matches_name(needle))
    }
}

/// Which appointments a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    Patient(Uuid),
    Doctor(Uuid),
    All,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("You do not have permission to view this appointment.")]
    NotParticipant,

    #[error("{0}")]
    InvalidTime(String),

    #[error("Doctor is not available at the selected time.")]
    DoctorNotAvailable,

    #[error("This time slot is already booked.")]
    SlotTaken,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Appointment is already {0} and cannot be changed.")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("You can only review completed appointments.")]
    ReviewNotAllowed,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::NotParticipant => AppError::Forbidden(err.to_string()),
            AppointmentError::SlotTaken => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTime(_)
            | AppointmentError::DoctorNotAvailable
            | AppointmentError::InvalidStatus(_)
            | AppointmentError::InvalidStatusTransition(_)
            | AppointmentError::ReviewNotAllowed
            | AppointmentError::Validation(_) => AppError::ValidationError(err.to_string()),
            AppointmentError::Doctor(e) => e.into(),
            AppointmentError::Profile(e) => e.into(),
            AppointmentError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctor_cell::services::slots::ACTIVE_APPOINTMENT_STATUSES;

    #[test]
    fn active_statuses_match_slot_computation() {
        let active: Vec<&str> = AppointmentStatus::ALL
            .iter()
            .filter(|s| s.is_active())
            .map(AppointmentStatus::as_str)
            .collect();
        assert_eq!(active, ACTIVE_APPOINTMENT_STATUSES.to_vec());
    }

    #[test]
    fn status_parses_known_choices_only() {
        assert_eq!("Completed".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Completed);
        assert!(matches!(
            "no_show".parse::<AppointmentStatus>(),
            Err(AppointmentError::InvalidStatus(_))
        ));
    }

    #[test]
    fn terminal_statuses() {
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
        assert!(!AppointmentStatus::Rescheduled.is_terminal());
    }

    #[test]
    fn search_matches_number_and_names() {
        let appointment: Appointment = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "appointment_number": "APT-20240101-ABC123",
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "appointment_date": "2024-01-10",
            "appointment_time": "09:30:00",
            "end_time": null,
            "reason": null,
            "status": "pending",
            "meeting_link": null,
            "notes": null,
            "cancellation_reason": null,
            "created_at": null,
            "updated_at": null,
            "patient": { "id": Uuid::new_v4(), "user_id": Uuid::new_v4(), "user": { "username": "jd", "first_name": "Jane", "last_name": "Doe" } }
        }))
        .unwrap();

        assert!(appointment.matches_search("abc123"));
        assert!(appointment.matches_search("doe"));
        assert!(!appointment.matches_search("house"));
        assert_eq!(appointment.doctor_name(), "Doctor");
    }
}
