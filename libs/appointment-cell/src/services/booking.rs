use chrono::{NaiveDateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::services::AvailabilityService;
use notification_cell::{NewNotification, NotificationService, NotificationType};
use profile_cell::models::{Patient, UserName};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_utils::numbering::appointment_number;

use crate::models::{
    Appointment, AppointmentError, AppointmentScope, AppointmentStatus, BookAppointmentRequest, Participant,
    RescheduleRequest, APPOINTMENT_EMBED,
};
use crate::services::lifecycle::{
    booking_window_admits, end_time_for, ensure_not_past, reschedule_window_admits, validate_status_transition,
};

/// Admins see everything; patients and doctors only their own bookings.
pub fn ensure_can_view(appointment: &Appointment, user_id: Uuid, role: Role) -> Result<(), AppointmentError> {
    let allowed = match role {
        Role::Admin => true,
        Role::Patient => appointment.patient_user_id() == Some(user_id),
        Role::Doctor => appointment.doctor_user_id() == Some(user_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(AppointmentError::NotParticipant)
    }
}

pub struct AppointmentService {
    supabase: SupabaseClient,
    availability: AvailabilityService,
    notifications: NotificationService,
    slot_minutes: i64,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            availability: AvailabilityService::new(config),
            notifications: NotificationService::new(config),
            slot_minutes: config.slot_minutes,
        }
    }

    pub async fn get(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", appointment_id, APPOINTMENT_EMBED);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Newest first by date then time, optionally narrowed by a search term.
    pub async fn list(
        &self,
        scope: AppointmentScope,
        search: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = match scope {
            AppointmentScope::Patient(id) => format!("patient_id=eq.{}&", id),
            AppointmentScope::Doctor(id) => format!("doctor_id=eq.{}&", id),
            AppointmentScope::All => String::new(),
        };
        let path = format!(
            "/rest/v1/appointments?{}select={}&order=appointment_date.desc,appointment_time.desc",
            filter, APPOINTMENT_EMBED
        );

        let appointments: Vec<Appointment> = self.supabase.select(&path, Some(auth_token)).await?;
        Ok(match search {
            Some(needle) => appointments.into_iter().filter(|a| a.matches_search(needle)).collect(),
            None => appointments,
        })
    }

    async fn active_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Participant, AppointmentError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&is_active=eq.true&select=id,user_id,consultation_fee,user:users(username,first_name,last_name)",
            doctor_id
        );
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(AppointmentError::DoctorNotFound)
    }

    pub async fn book(
        &self,
        patient: &Patient,
        doctor_id: Uuid,
        request: BookAppointmentRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking appointment for patient {} with doctor {}", patient.id, doctor_id);

        let doctor = self.active_doctor(doctor_id, auth_token).await?;
        let date = request.appointment_date;
        let time = request.appointment_time;

        ensure_not_past(date, time, now)?;

        let windows = self
            .availability
            .windows_for_date(doctor_id, date, Some(auth_token))
            .await?;
        if !booking_window_admits(&windows, date, time) {
            return Err(AppointmentError::DoctorNotAvailable);
        }

        let booked = self
            .availability
            .booked_times(doctor_id, date, None, Some(auth_token))
            .await?;
        if booked.contains(&time) {
            return Err(AppointmentError::SlotTaken);
        }

        let row = json!({
            "appointment_number": appointment_number(Utc::now()),
            "patient_id": patient.id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time.format("%H:%M:%S").to_string(),
            "end_time": end_time_for(time, self.slot_minutes).format("%H:%M:%S").to_string(),
            "reason": request.reason,
            "status": AppointmentStatus::Pending,
            "payment_status": "pending",
            "is_reminder_sent": false,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        // The unique (doctor, date, time) constraint turns a racing insert into a 409.
        let mut appointment: Appointment = self.supabase.insert("appointments", row, Some(auth_token)).await?;
        info!("Appointment {} booked with doctor {}", appointment.appointment_number, doctor_id);

        let doctor_name = doctor.user.full_name();
        let when = format!("{} at {}", date, time.format("%H:%M"));
        self.notifications
            .notify_all(
                vec![
                    notice(
                        &appointment,
                        doctor.user_id,
                        "New appointment booked",
                        format!("Appointment {} was booked for {}.", appointment.appointment_number, when),
                    ),
                    notice(
                        &appointment,
                        patient.user_id,
                        "Appointment booked",
                        format!("Appointment booked with Dr. {} on {}.", doctor_name, when),
                    ),
                ],
                auth_token,
            )
            .await;

        appointment.doctor = Some(doctor);
        appointment.patient = Some(Participant {
            id: patient.id,
            user_id: patient.user_id,
            consultation_fee: None,
            user: UserName::default(),
        });
        Ok(appointment)
    }

    async fn patch(&self, appointment_id: Uuid, mut changes: Value, auth_token: &str) -> Result<Appointment, AppointmentError> {
        changes["updated_at"] = json!(Utc::now().to_rfc3339());
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", appointment_id, APPOINTMENT_EMBED);
        let rows: Vec<Appointment> = self.supabase.update(&path, changes, Some(auth_token)).await?;
        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    pub async fn update_status(
        &self,
        appointment: &Appointment,
        status: AppointmentStatus,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        validate_status_transition(appointment.status, status)?;

        let mut changes = json!({ "status": status });
        if let Some(notes) = notes {
            changes["notes"] = json!(notes);
        }
        let updated = self.patch(appointment.id, changes, auth_token).await?;
        info!("Appointment {} status set to {}", updated.appointment_number, status);

        if let Some(patient_user) = updated.patient_user_id() {
            self.notifications
                .notify_all(
                    vec![notice(
                        &updated,
                        patient_user,
                        format!("Appointment {}", status.label().to_lowercase()),
                        format!(
                            "Your appointment {} with Dr. {} is now {}.",
                            updated.appointment_number,
                            updated.doctor_name(),
                            status.label()
                        ),
                    )],
                    auth_token,
                )
                .await;
        }
        Ok(updated)
    }

    pub async fn reschedule(
        &self,
        appointment: &Appointment,
        actor: Role,
        request: RescheduleRequest,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        validate_status_transition(appointment.status, AppointmentStatus::Rescheduled)?;

        let date = request.new_date;
        let time = request.new_time;
        ensure_not_past(date, time, now)?;

        let windows = self
            .availability
            .windows_for_date(appointment.doctor_id, date, Some(auth_token))
            .await?;
        if !reschedule_window_admits(&windows, date, time) {
            return Err(AppointmentError::DoctorNotAvailable);
        }

        let booked = self
            .availability
            .booked_times(appointment.doctor_id, date, Some(appointment.id), Some(auth_token))
            .await?;
        if booked.contains(&time) {
            return Err(AppointmentError::SlotTaken);
        }

        let changes = json!({
            "appointment_date": date,
            "appointment_time": time.format("%H:%M:%S").to_string(),
            "end_time": end_time_for(time, self.slot_minutes).format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Rescheduled,
        });
        let updated = self.patch(appointment.id, changes, auth_token).await?;
        info!("Appointment {} rescheduled to {} {}", updated.appointment_number, date, time);

        let message = format!(
            "Appointment {} was moved to {} at {}.",
            updated.appointment_number,
            date,
            time.format("%H:%M")
        );
        let notices = other_parties(&updated, actor)
            .into_iter()
            .map(|recipient| notice(&updated, recipient, "Appointment rescheduled", message.clone()))
            .collect();
        self.notifications.notify_all(notices, auth_token).await;

        Ok(updated)
    }

    pub async fn cancel(
        &self,
        appointment: &Appointment,
        actor: Role,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let changes = json!({
            "status": AppointmentStatus::Cancelled,
            "cancellation_reason": reason,
        });
        let updated = self.patch(appointment.id, changes, auth_token).await?;
        info!("Appointment {} cancelled by {}", updated.appointment_number, actor);

        let message = match reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!("Appointment {} was cancelled: {}", updated.appointment_number, reason),
            None => format!("Appointment {} was cancelled.", updated.appointment_number),
        };
        let notices = other_parties(&updated, actor)
            .into_iter()
            .map(|recipient| notice(&updated, recipient, "Appointment cancelled", message.clone()))
            .collect();
        self.notifications.notify_all(notices, auth_token).await;

        Ok(updated)
    }
}

fn notice(
    appointment: &Appointment,
    recipient: Uuid,
    title: impl Into<String>,
    message: impl Into<String>,
) -> NewNotification {
    NewNotification::new(recipient, NotificationType::Appointment, title, message)
        .related(appointment.id, "appointment")
        .with_action_url(format!("/appointments/{}", appointment.id))
}

/// Users to tell about a change made by `actor`.
fn other_parties(appointment: &Appointment, actor: Role) -> Vec<Uuid> {
    let patient = appointment.patient_user_id();
    let doctor = appointment.doctor_user_id();
    match actor {
        Role::Patient => doctor.into_iter().collect(),
        Role::Doctor => patient.into_iter().collect(),
        Role::Admin => patient.into_iter().chain(doctor).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn appointment(patient_user: Uuid, doctor_user: Uuid) -> Appointment {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "appointment_number": "APT-20240101-ABC123",
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "appointment_date": "2024-01-10",
            "appointment_time": "09:30:00",
            "end_time": "10:00:00",
            "reason": null,
            "status": "confirmed",
            "meeting_link": null,
            "notes": null,
            "cancellation_reason": null,
            "created_at": null,
            "updated_at": null,
            "patient": { "id": Uuid::new_v4(), "user_id": patient_user },
            "doctor": { "id": Uuid::new_v4(), "user_id": doctor_user }
        }))
        .unwrap()
    }

    #[test]
    fn only_participants_and_admins_can_view() {
        let (patient, doctor, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let appt = appointment(patient, doctor);

        assert!(ensure_can_view(&appt, patient, Role::Patient).is_ok());
        assert!(ensure_can_view(&appt, doctor, Role::Doctor).is_ok());
        assert!(ensure_can_view(&appt, stranger, Role::Admin).is_ok());
        assert_matches!(ensure_can_view(&appt, stranger, Role::Patient), Err(AppointmentError::NotParticipant));
        // A doctor id in the patient slot does not grant access.
        assert_matches!(ensure_can_view(&appt, patient, Role::Doctor), Err(AppointmentError::NotParticipant));
    }

    #[test]
    fn changes_notify_the_other_side() {
        let (patient, doctor) = (Uuid::new_v4(), Uuid::new_v4());
        let appt = appointment(patient, doctor);

        assert_eq!(other_parties(&appt, Role::Patient), vec![doctor]);
        assert_eq!(other_parties(&appt, Role::Doctor), vec![patient]);
        assert_eq!(other_parties(&appt, Role::Admin), vec![patient, doctor]);
    }
}
