use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, Participant};
use profile_cell::models::ProfileError;
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::FieldErrors;

pub const PAYMENTS_PER_PAGE: usize = 15;

pub const PAYMENT_EMBED: &str = "*,patient:patients(id,user_id,user:users(username,first_name,last_name)),appointment:appointments(id,appointment_number,appointment_date,doctor:doctors(id,user_id,user:users(username,first_name,last_name)))";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    NetBanking,
    Upi,
    Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

/// Appointment summary embedded in a payment select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidAppointment {
    pub id: Uuid,
    pub appointment_number: String,
    pub appointment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Participant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub amount: f64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub invoice_number: String,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    pub payment_gateway_response: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment: Option<PaidAppointment>,
}

impl Payment {
    pub fn patient_user_id(&self) -> Option<Uuid> {
        self.patient.as_ref().map(|p| p.user_id)
    }

    pub fn patient_username(&self) -> &str {
        self.patient.as_ref().map(|p| p.user.username.as_str()).unwrap_or_default()
    }

    /// Case-insensitive match on invoice, patient username or transaction id.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.invoice_number.to_lowercase().contains(&needle)
            || self.patient_username().to_lowercase().contains(&needle)
            || self
                .transaction_id
                .as_deref()
                .is_some_and(|txn| txn.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentScope {
    Doctor(Uuid),
    All,
}

/// Simulated card form. Nothing here is stored or sent anywhere.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
}

impl CardDetails {
    pub fn validate(&self, today: NaiveDate) -> Result<(), PaymentError> {
        let mut errors = FieldErrors::new();

        let digits: String = self
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        errors.check(
            (13..=16).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()),
            "card_number",
            "Enter a card number of 13 to 16 digits.",
        );

        let month = self
            .expiry_month
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|m| (1..=12).contains(m) && self.expiry_month.trim().len() <= 2);
        errors.check(month.is_some(), "expiry_month", "Enter a month between 01 and 12.");

        let year_text = self.expiry_year.trim();
        let year = year_text
            .parse::<i32>()
            .ok()
            .filter(|_| year_text.len() == 4);
        errors.check(year.is_some(), "expiry_year", "Enter a 4-digit year.");

        if let (Some(month), Some(year)) = (month, year) {
            errors.check(
                (year, month) >= (today.year(), today.month()),
                "expiry_year",
                "This card has expired.",
            );
        }

        let cvv = self.cvv.trim();
        errors.check(
            cvv.len() == 3 && cvv.chars().all(|c| c.is_ascii_digit()),
            "cvv",
            "Enter the 3-digit security code.",
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::InvalidCard(errors.messages().join("; ")))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment not found")]
    NotFound,

    #[error("This appointment has already been paid for.")]
    AlreadyPaid,

    #[error("Invalid card details. {0}")]
    InvalidCard(String),

    #[error("No consultation fee is set for this doctor.")]
    MissingFee,

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound => AppError::NotFound(err.to_string()),
            PaymentError::AlreadyPaid => AppError::Conflict(err.to_string()),
            PaymentError::InvalidCard(_) | PaymentError::MissingFee => AppError::ValidationError(err.to_string()),
            PaymentError::Appointment(e) => e.into(),
            PaymentError::Profile(e) => e.into(),
            PaymentError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn card(number: &str, month: &str, year: &str, cvv: &str) -> CardDetails {
        CardDetails {
            card_number: number.into(),
            expiry_month: month.into(),
            expiry_year: year.into(),
            cvv: cvv.into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn accepts_a_plausible_card() {
        assert!(card("4242 4242 4242 4242", "06", "2025", "123").validate(today()).is_ok());
        assert!(card("4000000000002", "12", "2030", "999").validate(today()).is_ok());
    }

    #[test]
    fn rejects_bad_numbers_and_codes() {
        assert_matches!(
            card("4242", "06", "2026", "123").validate(today()),
            Err(PaymentError::InvalidCard(msg)) if msg.starts_with("card_number:")
        );
        assert_matches!(
            card("4242424242424242", "13", "2026", "12").validate(today()),
            Err(PaymentError::InvalidCard(msg)) if msg.contains("expiry_month:") && msg.contains("cvv:")
        );
        assert!(card("4242424242424242", "06", "26", "123").validate(today()).is_err());
    }

    #[test]
    fn rejects_expired_cards() {
        assert_matches!(
            card("4242424242424242", "05", "2025", "123").validate(today()),
            Err(PaymentError::InvalidCard(msg)) if msg.contains("expired")
        );
    }

    #[test]
    fn search_covers_invoice_username_and_transaction() {
        let payment: Payment = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "appointment_id": null,
            "patient_id": null,
            "amount": 150.0,
            "transaction_id": "TXN-20250101-ABCDEF",
            "payment_date": null,
            "invoice_number": "INV-20250101-123456",
            "payment_gateway_response": null,
            "created_at": null,
            "updated_at": null,
            "patient": { "id": Uuid::new_v4(), "user_id": Uuid::new_v4(), "user": { "username": "jdoe" } }
        }))
        .unwrap();

        assert!(payment.matches_search("inv-2025"));
        assert!(payment.matches_search("JDOE"));
        assert!(payment.matches_search("abcdef"));
        assert!(!payment.matches_search("house"));
    }
}
