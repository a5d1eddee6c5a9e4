use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentPaymentStatus};
use notification_cell::{NewNotification, NotificationService, NotificationType};
use shared_config::AppConfig;
use shared_database::{in_list, SupabaseClient};
use shared_utils::numbering::{invoice_number, transaction_id};

use crate::models::{CardDetails, Payment, PaymentError, PaymentMethod, PaymentScope, PaymentStatus, PAYMENT_EMBED};

pub struct PaymentService {
    supabase: SupabaseClient,
    notifications: NotificationService,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            notifications: NotificationService::new(config),
        }
    }

    pub async fn get(&self, payment_id: Uuid, auth_token: &str) -> Result<Payment, PaymentError> {
        let path = format!("/rest/v1/payments?id=eq.{}&select={}", payment_id, PAYMENT_EMBED);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(PaymentError::NotFound)
    }

    pub async fn for_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Option<Payment>, PaymentError> {
        let path = format!("/rest/v1/payments?appointment_id=eq.{}&select={}", appointment_id, PAYMENT_EMBED);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    /// The appointment's payment, opened as pending at the doctor's fee on
    /// first use.
    pub async fn get_or_create(&self, appointment: &Appointment, auth_token: &str) -> Result<Payment, PaymentError> {
        if let Some(existing) = self.for_appointment(appointment.id, auth_token).await? {
            return Ok(existing);
        }

        let amount = appointment
            .doctor
            .as_ref()
            .and_then(|d| d.consultation_fee)
            .ok_or(PaymentError::MissingFee)?;

        let now = Utc::now();
        let row = json!({
            "appointment_id": appointment.id,
            "patient_id": appointment.patient_id,
            "amount": amount,
            "payment_method": PaymentMethod::CreditCard,
            "payment_status": PaymentStatus::Pending,
            "invoice_number": invoice_number(now),
            "tax_amount": 0.0,
            "discount_amount": 0.0,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let payment: Payment = match self.supabase.insert("payments", row, Some(auth_token)).await {
            Ok(payment) => payment,
            // Lost a race on the unique appointment_id; use the winner's row.
            Err(e) if e.is_conflict() => self
                .for_appointment(appointment.id, auth_token)
                .await?
                .ok_or(PaymentError::NotFound)?,
            Err(e) => return Err(e.into()),
        };
        info!("Opened payment {} for appointment {}", payment.invoice_number, appointment.appointment_number);
        Ok(payment)
    }

    /// Settle the appointment with a simulated card charge.
    pub async fn process(
        &self,
        appointment: &Appointment,
        card: &CardDetails,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Payment, PaymentError> {
        debug!("Processing payment for appointment {}", appointment.appointment_number);

        if appointment.payment_status == AppointmentPaymentStatus::Paid {
            return Err(PaymentError::AlreadyPaid);
        }
        let payment = self.get_or_create(appointment, auth_token).await?;
        if payment.payment_status == PaymentStatus::Completed {
            return Err(PaymentError::AlreadyPaid);
        }

        card.validate(now.date_naive())?;

        let changes = json!({
            "payment_status": PaymentStatus::Completed,
            "payment_date": now.to_rfc3339(),
            "transaction_id": transaction_id(now),
            "updated_at": now.to_rfc3339(),
        });
        let path = format!("/rest/v1/payments?id=eq.{}&select={}", payment.id, PAYMENT_EMBED);
        let rows: Vec<Payment> = self.supabase.update(&path, changes, Some(auth_token)).await?;
        let paid = rows.into_iter().next().ok_or(PaymentError::NotFound)?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let _: Vec<Value> = self
            .supabase
            .update(
                &path,
                json!({ "payment_status": AppointmentPaymentStatus::Paid, "updated_at": now.to_rfc3339() }),
                Some(auth_token),
            )
            .await?;
        info!(
            "Payment {} completed for appointment {}",
            paid.invoice_number, appointment.appointment_number
        );

        if let Some(patient_user) = appointment.patient_user_id() {
            let notice = NewNotification::new(
                patient_user,
                NotificationType::Payment,
                "Payment received",
                format!(
                    "We received {:.2} for appointment {}. Invoice {}.",
                    paid.amount, appointment.appointment_number, paid.invoice_number
                ),
            )
            .related(paid.id, "payment")
            .with_action_url(format!("/payments/{}/success", paid.id));
            self.notifications.notify_all(vec![notice], auth_token).await;
        }

        Ok(paid)
    }

    /// Most recent payments first, optionally narrowed by a search term.
    pub async fn list(
        &self,
        scope: PaymentScope,
        search: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Payment>, PaymentError> {
        let filter = match scope {
            PaymentScope::All => String::new(),
            PaymentScope::Doctor(doctor_id) => {
                let path = format!("/rest/v1/appointments?doctor_id=eq.{}&select=id", doctor_id);
                let rows: Vec<Value> = self.supabase.select(&path, Some(auth_token)).await?;
                let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                format!("appointment_id={}&", in_list(ids))
            }
        };

        let path = format!(
            "/rest/v1/payments?{}select={}&order=payment_date.desc.nullslast",
            filter, PAYMENT_EMBED
        );
        let payments: Vec<Payment> = self.supabase.select(&path, Some(auth_token)).await?;
        Ok(match search {
            Some(needle) => payments.into_iter().filter(|p| p.matches_search(needle)).collect(),
            None => payments,
        })
    }
}
