use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus, APPOINTMENT_EMBED};
use medical_record_cell::MedicalRecordService;
use notification_cell::NotificationService;
use profile_cell::models::{Doctor, Patient};
use profile_cell::services::UserService;
use shared_config::AppConfig;
use shared_database::{in_list, SupabaseClient};
use shared_models::auth::Role;

use crate::models::{AdminDashboard, DoctorDashboard, PatientDashboard, ReportError, DASHBOARD_LIST_LIMIT};

fn active_statuses() -> String {
    in_list(
        AppointmentStatus::ALL
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.as_str()),
    )
}

pub struct DashboardService {
    supabase: SupabaseClient,
    users: UserService,
    records: MedicalRecordService,
    notifications: NotificationService,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            users: UserService::new(config),
            records: MedicalRecordService::new(config),
            notifications: NotificationService::new(config),
        }
    }

    async fn appointments(&self, query: String, auth_token: &str) -> Result<Vec<Appointment>, ReportError> {
        let path = format!("/rest/v1/appointments?{}&select={}", query, APPOINTMENT_EMBED);
        Ok(self.supabase.select(&path, Some(auth_token)).await?)
    }

    async fn count(&self, table: &str, filter: &str, auth_token: &str) -> Result<usize, ReportError> {
        let path = if filter.is_empty() {
            format!("/rest/v1/{}?select=id", table)
        } else {
            format!("/rest/v1/{}?{}&select=id", table, filter)
        };
        Ok(self.supabase.count(&path, Some(auth_token)).await?)
    }

    pub async fn for_patient(
        &self,
        patient: Patient,
        user_id: Uuid,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<PatientDashboard, ReportError> {
        debug!("Building patient dashboard for {}", patient.id);

        let upcoming = format!(
            "patient_id=eq.{}&appointment_date=gte.{}&status={}&order=appointment_date.asc,appointment_time.asc&limit={}",
            patient.id,
            today,
            active_statuses(),
            DASHBOARD_LIST_LIMIT
        );
        let pending = format!("patient_id=eq.{}&status=eq.pending", patient.id);

        let (upcoming_appointments, medical_records, pending_appointments_count, recent_notifications, unread) = futures::try_join!(
            self.appointments(upcoming, auth_token),
            async {
                Ok::<_, ReportError>(
                    self.records
                        .recent_for_patient(patient.id, DASHBOARD_LIST_LIMIT, auth_token)
                        .await?,
                )
            },
            self.count("appointments", &pending, auth_token),
            async {
                Ok::<_, ReportError>(
                    self.notifications
                        .latest_for_user(user_id, DASHBOARD_LIST_LIMIT, auth_token)
                        .await?,
                )
            },
            async { Ok::<_, ReportError>(self.notifications.unread_count(user_id, auth_token).await?) },
        )?;

        Ok(PatientDashboard {
            patient,
            upcoming_appointments,
            medical_records,
            pending_appointments_count,
            recent_notifications,
            unread_notifications_count: unread,
        })
    }

    pub async fn for_doctor(
        &self,
        doctor: Doctor,
        user_id: Uuid,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<DoctorDashboard, ReportError> {
        debug!("Building doctor dashboard for {}", doctor.id);

        let todays = format!(
            "doctor_id=eq.{}&appointment_date=eq.{}&status={}&order=appointment_time.asc",
            doctor.id,
            today,
            active_statuses()
        );
        let patients_path = format!("/rest/v1/appointments?doctor_id=eq.{}&select=patient_id", doctor.id);

        let (today_appointments, patient_rows, unread) = futures::try_join!(
            self.appointments(todays, auth_token),
            async {
                let rows: Vec<Value> = self.supabase.select(&patients_path, Some(auth_token)).await?;
                Ok::<_, ReportError>(rows)
            },
            async { Ok::<_, ReportError>(self.notifications.unread_count(user_id, auth_token).await?) },
        )?;

        let patient_count = patient_rows
            .iter()
            .filter_map(|row| row["patient_id"].as_str())
            .collect::<HashSet<_>>()
            .len();

        Ok(DoctorDashboard {
            doctor,
            today_appointments,
            patient_count,
            unread_notifications_count: unread,
        })
    }

    pub async fn for_admin(&self, auth_token: &str) -> Result<AdminDashboard, ReportError> {
        let (total_patients, total_doctors, total_appointments, completed_appointments) = futures::try_join!(
            async { Ok::<_, ReportError>(self.users.count_by_role(Role::Patient, auth_token).await?) },
            async { Ok::<_, ReportError>(self.users.count_by_role(Role::Doctor, auth_token).await?) },
            self.count("appointments", "", auth_token),
            self.count("appointments", "status=eq.completed", auth_token),
        )?;

        Ok(AdminDashboard {
            total_patients,
            total_doctors,
            total_appointments,
            completed_appointments,
        })
    }
}
