use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use doctor_cell::models::Review;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, ReviewRequest};

pub struct ReviewService {
    supabase: SupabaseClient,
}

impl ReviewService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn for_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Option<Review>, AppointmentError> {
        let path = format!("/rest/v1/reviews?appointment_id=eq.{}", appointment_id);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    /// Create the appointment's review, or replace the one already there.
    pub async fn submit(
        &self,
        appointment: &Appointment,
        request: ReviewRequest,
        auth_token: &str,
    ) -> Result<Review, AppointmentError> {
        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::ReviewNotAllowed);
        }
        if !(1..=5).contains(&request.rating) {
            return Err(AppointmentError::Validation(
                "Rating must be between 1 and 5.".to_string(),
            ));
        }

        let fields = json!({
            "rating": request.rating,
            "comment": request.comment,
            "is_anonymous": request.is_anonymous,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let review = match self.for_appointment(appointment.id, auth_token).await? {
            Some(existing) => {
                let path = format!("/rest/v1/reviews?id=eq.{}", existing.id);
                let rows: Vec<Review> = self.supabase.update(&path, fields, Some(auth_token)).await?;
                rows.into_iter().next().ok_or(AppointmentError::NotFound)?
            }
            None => {
                let mut row = fields;
                row["appointment_id"] = json!(appointment.id);
                row["doctor_id"] = json!(appointment.doctor_id);
                row["patient_id"] = json!(appointment.patient_id);
                row["created_at"] = json!(Utc::now().to_rfc3339());
                self.supabase.insert("reviews", row, Some(auth_token)).await?
            }
        };

        info!("Review {} saved for appointment {}", review.id, appointment.appointment_number);
        Ok(review)
    }
}
