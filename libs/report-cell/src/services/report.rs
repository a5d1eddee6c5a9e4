use chrono::{Duration, NaiveDate};
use tracing::info;

use appointment_cell::models::{Appointment, APPOINTMENT_EMBED};
use payment_cell::models::{Payment, PAYMENT_EMBED};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{AppointmentsReport, PaymentsReport, Report, ReportError, ReportType};

/// Report search matches usernames rather than display names.
fn appointment_matches(appointment: &Appointment, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let username_hit = |username: Option<&str>| username.is_some_and(|u| u.to_lowercase().contains(&needle));

    appointment.appointment_number.to_lowercase().contains(&needle)
        || username_hit(appointment.patient.as_ref().map(|p| p.user.username.as_str()))
        || username_hit(appointment.doctor.as_ref().map(|d| d.user.username.as_str()))
}

fn total_amount(payments: &[Payment]) -> f64 {
    let total: f64 = payments.iter().map(|p| p.amount).sum();
    (total * 100.0).round() / 100.0
}

pub struct ReportService {
    supabase: SupabaseClient,
}

impl ReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn generate(
        &self,
        report_type: ReportType,
        start: NaiveDate,
        end: NaiveDate,
        search: Option<&str>,
        auth_token: &str,
    ) -> Result<Report, ReportError> {
        let report = match report_type {
            ReportType::Appointments => Report::Appointments(self.appointments(start, end, search, auth_token).await?),
            ReportType::Payments => Report::Payments(self.payments(start, end, search, auth_token).await?),
        };
        info!("Generated {} for {} to {}", report_type.title(), start, end);
        Ok(report)
    }

    pub async fn appointments(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        search: Option<&str>,
        auth_token: &str,
    ) -> Result<AppointmentsReport, ReportError> {
        let path = format!(
            "/rest/v1/appointments?and=(appointment_date.gte.{},appointment_date.lte.{})&select={}&order=appointment_date.asc,appointment_time.asc",
            start, end, APPOINTMENT_EMBED
        );
        let mut appointments: Vec<Appointment> = self.supabase.select(&path, Some(auth_token)).await?;
        if let Some(needle) = search {
            appointments.retain(|a| appointment_matches(a, needle));
        }

        Ok(AppointmentsReport {
            report_title: ReportType::Appointments.title(),
            start_date: start,
            end_date: end,
            total_count: appointments.len(),
            appointments,
        })
    }

    /// Completed payments whose payment date falls within `start..=end`.
    pub async fn payments(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        search: Option<&str>,
        auth_token: &str,
    ) -> Result<PaymentsReport, ReportError> {
        let day_after = end + Duration::days(1);
        let path = format!(
            "/rest/v1/payments?payment_status=eq.completed&and=(payment_date.gte.{},payment_date.lt.{})&select={}&order=payment_date.asc",
            start,
            day_after,
            PAYMENT_EMBED
        );
        let mut payments: Vec<Payment> = self.supabase.select(&path, Some(auth_token)).await?;
        if let Some(needle) = search {
            payments.retain(|p| p.matches_search(needle));
        }

        Ok(PaymentsReport {
            report_title: ReportType::Payments.title(),
            start_date: start,
            end_date: end,
            total_count: payments.len(),
            total_amount: total_amount(&payments),
            payments,
        })
    }
}
