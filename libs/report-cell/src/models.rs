use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use appointment_cell::models::{Appointment, AppointmentError};
use medical_record_cell::models::{MedicalRecord, MedicalRecordError};
use notification_cell::{Notification, NotificationError};
use payment_cell::models::{Payment, PaymentError};
use profile_cell::models::{Doctor, Patient, ProfileError};
use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const DASHBOARD_LIST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Appointments,
    Payments,
}

impl ReportType {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Appointments => "Appointments Report",
            Self::Payments => "Payments Report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    Custom,
}

/// Report criteria as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub report_type: Option<String>,
    pub date_range: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub q: Option<String>,
}

impl ReportQuery {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn report_type(&self) -> Result<ReportType, ReportError> {
        parse_choice(self.report_type.as_deref(), "report_type")
    }

    pub fn date_range(&self) -> Result<DateRange, ReportError> {
        parse_choice(self.date_range.as_deref(), "date_range")
    }

    /// Inclusive `(start, end)` for the requested range relative to `today`.
    pub fn resolve_dates(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ReportError> {
        match self.date_range()? {
            DateRange::Today => Ok((today, today)),
            DateRange::ThisWeek => {
                let monday = today - chrono::Duration::days(today.weekday().num_days_from_monday() as i64);
                Ok((monday, today))
            }
            DateRange::ThisMonth => Ok((today.with_day(1).unwrap_or(today), today)),
            DateRange::ThisYear => Ok((today.with_ordinal(1).unwrap_or(today), today)),
            DateRange::Custom => {
                let (Some(start), Some(end)) = (
                    parse_date(self.start_date.as_deref())?,
                    parse_date(self.end_date.as_deref())?,
                ) else {
                    return Err(ReportError::Validation(
                        "Both start and end dates are required for custom date range.".to_string(),
                    ));
                };
                if start > end {
                    return Err(ReportError::Validation(
                        "Start date cannot be after end date.".to_string(),
                    ));
                }
                Ok((start, end))
            }
        }
    }
}

fn parse_choice<T: serde::de::DeserializeOwned>(raw: Option<&str>, field: &str) -> Result<T, ReportError> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ReportError::Validation(format!("{}: This field is required.", field)))?;
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| ReportError::Validation(format!("{}: Select a valid choice. {} is not one of the available choices.", field, raw)))
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ReportError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ReportError::Validation("Invalid date format provided.".to_string())),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDashboard {
    pub patient: Patient,
    pub upcoming_appointments: Vec<Appointment>,
    pub medical_records: Vec<MedicalRecord>,
    pub pending_appointments_count: usize,
    pub recent_notifications: Vec<Notification>,
    pub unread_notifications_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboard {
    pub doctor: Doctor,
    pub today_appointments: Vec<Appointment>,
    pub patient_count: usize,
    pub unread_notifications_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_patients: usize,
    pub total_doctors: usize,
    pub total_appointments: usize,
    pub completed_appointments: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Patient(PatientDashboard),
    Doctor(DoctorDashboard),
    Admin(AdminDashboard),
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentsReport {
    pub report_title: &'static str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub appointments: Vec<Appointment>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentsReport {
    pub report_title: &'static str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payments: Vec<Payment>,
    pub total_count: usize,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Appointments(AppointmentsReport),
    Payments(PaymentsReport),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    MedicalRecord(#[from] MedicalRecordError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(msg) => AppError::ValidationError(msg),
            ReportError::Appointment(e) => e.into(),
            ReportError::MedicalRecord(e) => e.into(),
            ReportError::Payment(e) => e.into(),
            ReportError::Profile(e) => e.into(),
            ReportError::Notification(e) => e.into(),
            ReportError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn query(range: &str, start: Option<&str>, end: Option<&str>) -> ReportQuery {
        ReportQuery {
            report_type: Some("appointments".into()),
            date_range: Some(range.into()),
            start_date: start.map(Into::into),
            end_date: end.map(Into::into),
            q: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn named_ranges_end_today() {
        // 2025-06-12 is a Thursday.
        let today = d(2025, 6, 12);
        assert_eq!(query("today", None, None).resolve_dates(today).unwrap(), (today, today));
        assert_eq!(query("this_week", None, None).resolve_dates(today).unwrap(), (d(2025, 6, 9), today));
        assert_eq!(query("this_month", None, None).resolve_dates(today).unwrap(), (d(2025, 6, 1), today));
        assert_eq!(query("this_year", None, None).resolve_dates(today).unwrap(), (d(2025, 1, 1), today));
    }

    #[test]
    fn week_starting_today_on_monday() {
        let monday = d(2025, 6, 9);
        assert_eq!(query("this_week", None, None).resolve_dates(monday).unwrap(), (monday, monday));
    }

    #[test]
    fn custom_range_needs_ordered_dates() {
        let today = d(2025, 6, 12);
        assert_eq!(
            query("custom", Some("2025-01-01"), Some("2025-01-31")).resolve_dates(today).unwrap(),
            (d(2025, 1, 1), d(2025, 1, 31))
        );
        assert_matches!(
            query("custom", Some("2025-01-01"), None).resolve_dates(today),
            Err(ReportError::Validation(msg)) if msg.contains("Both start and end dates")
        );
        assert_matches!(
            query("custom", Some("2025-02-01"), Some("2025-01-01")).resolve_dates(today),
            Err(ReportError::Validation(msg)) if msg == "Start date cannot be after end date."
        );
        assert_matches!(
            query("custom", Some("01/02/2025"), Some("2025-03-01")).resolve_dates(today),
            Err(ReportError::Validation(_))
        );
    }

    #[test]
    fn unknown_choices_are_rejected() {
        let mut q = query("fortnight", None, None);
        assert_matches!(q.date_range(), Err(ReportError::Validation(msg)) if msg.starts_with("date_range:"));
        q.report_type = Some("revenue".into());
        assert_matches!(q.report_type(), Err(ReportError::Validation(_)));
        q.report_type = None;
        assert_matches!(q.report_type(), Err(ReportError::Validation(msg)) if msg.contains("required"));
    }
}
