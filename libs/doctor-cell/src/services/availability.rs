use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{in_list, SupabaseClient};
use shared_utils::validation::FieldErrors;

use crate::models::{CreateAvailabilityRequest, DoctorAvailability, DoctorError, TimeSlot};
use crate::services::slots::{generate_slots, weekday_index, ACTIVE_APPOINTMENT_STATUSES};

pub struct AvailabilityService {
    supabase: SupabaseClient,
    slot_minutes: i64,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            slot_minutes: config.slot_minutes,
        }
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorAvailability>, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_availabilities?doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            doctor_id
        );
        Ok(self.supabase.select(&path, auth_token).await?)
    }

    pub async fn list_available(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorAvailability>, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_availabilities?doctor_id=eq.{}&is_available=eq.true&order=day_of_week.asc,start_time.asc",
            doctor_id
        );
        Ok(self.supabase.select(&path, auth_token).await?)
    }

    /// Available windows on the weekday of `date`; validity is checked by
    /// the caller.
    pub async fn windows_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorAvailability>, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_availabilities?doctor_id=eq.{}&day_of_week=eq.{}&is_available=eq.true&order=start_time.asc",
            doctor_id,
            weekday_index(date)
        );
        Ok(self.supabase.select(&path, auth_token).await?)
    }

    pub async fn create(
        &self,
        doctor_id: Uuid,
        request: CreateAvailabilityRequest,
        auth_token: &str,
    ) -> Result<DoctorAvailability, DoctorError> {
        debug!("Creating availability for doctor: {}", doctor_id);

        let valid_from = request.valid_from.unwrap_or_else(|| Utc::now().date_naive());

        let mut errors = FieldErrors::new();
        errors.check(
            (0..=6).contains(&request.day_of_week),
            "day_of_week",
            "Day of week must be between 0 (Monday) and 6 (Sunday).",
        );
        errors.check(
            request.start_time < request.end_time,
            "start_time",
            "Start time must be before end time.",
        );
        if let Some(valid_to) = request.valid_to {
            errors.check(valid_to >= valid_from, "valid_to", "Valid to cannot be before valid from.");
        }
        if !errors.is_empty() {
            return Err(DoctorError::Validation(errors.messages().join("; ")));
        }

        let path = format!(
            "/rest/v1/doctor_availabilities?doctor_id=eq.{}&day_of_week=eq.{}",
            doctor_id, request.day_of_week
        );
        let same_day: Vec<DoctorAvailability> = self.supabase.select(&path, Some(auth_token)).await?;
        if same_day.iter().any(|w| w.overlaps(request.start_time, request.end_time)) {
            return Err(DoctorError::OverlappingAvailability);
        }

        let row = json!({
            "doctor_id": doctor_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "is_available": request.is_available.unwrap_or(true),
            "recurring": request.recurring.unwrap_or(true),
            "valid_from": valid_from,
            "valid_to": request.valid_to,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let availability: DoctorAvailability = self
            .supabase
            .insert("doctor_availabilities", row, Some(auth_token))
            .await?;
        info!("Availability {} added for doctor {}", availability.id, doctor_id);
        Ok(availability)
    }

    /// Only the owning doctor's rows can be removed; anything else is 404.
    pub async fn delete(
        &self,
        doctor_id: Uuid,
        availability_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorAvailability, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_availabilities?id=eq.{}&doctor_id=eq.{}",
            availability_id, doctor_id
        );
        let availability: DoctorAvailability = self
            .supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(DoctorError::AvailabilityNotFound)?;

        self.supabase.delete(&path, Some(auth_token)).await?;
        debug!("Deleted availability {} ({})", availability_id, availability.day_name());
        Ok(availability)
    }

    /// Start times on `date` held by active appointments, optionally
    /// ignoring one appointment (the one being rescheduled).
    pub async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<HashSet<NaiveTime>, DoctorError> {
        #[derive(Deserialize)]
        struct Booked {
            appointment_time: NaiveTime,
        }

        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status={}&select=appointment_time",
            doctor_id,
            date,
            in_list(ACTIVE_APPOINTMENT_STATUSES)
        );
        if let Some(id) = exclude_appointment {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<Booked> = self.supabase.select(&path, auth_token).await?;
        Ok(rows.into_iter().map(|r| r.appointment_time).collect())
    }

    /// Free slots of an active doctor on `date`.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
        auth_token: Option<&str>,
    ) -> Result<Vec<TimeSlot>, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&is_active=eq.true&select=id", doctor_id);
        let doctor: Option<Value> = self.supabase.select_one(&path, auth_token).await?;
        if doctor.is_none() {
            return Err(DoctorError::NotFound);
        }

        let windows = self.windows_for_date(doctor_id, date, auth_token).await?;
        let booked = self.booked_times(doctor_id, date, None, auth_token).await?;

        Ok(generate_slots(&windows, date, now, self.slot_minutes, &booked))
    }
}
