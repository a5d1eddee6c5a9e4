use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: String::new(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock server.
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_service_key(mut self, key: &str) -> Self {
        self.supabase_service_role_key = key.to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            port: shared_config::DEFAULT_PORT,
            slot_minutes: shared_config::DEFAULT_SLOT_MINUTES,
            oauth_redirect_url: "http://localhost:3000/auth/oauth/callback".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            app_metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for the clinic tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_row(user_id: &str, username: &str, role: &str) -> Value {
        json!({
            "id": user_id,
            "username": username,
            "email": format!("{}@example.com", username),
            "first_name": "Test",
            "last_name": username,
            "role": role,
            "phone": null,
            "is_verified": false,
            "is_active": true,
            "date_joined": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(doctor_id: &str, user_id: &str) -> Value {
        json!({
            "id": doctor_id,
            "user_id": user_id,
            "experience_years": 10,
            "consultation_fee": 150.0,
            "license_number": "MD123456",
            "clinic_address": "1 Main Street",
            "available_days": "Mon,Tue,Wed",
            "available_from": "09:00:00",
            "available_to": "17:00:00",
            "is_active": true,
            "education": "Medical University",
            "languages": "English",
            "awards": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(patient_id: &str, user_id: &str) -> Value {
        json!({
            "id": patient_id,
            "user_id": user_id,
            "blood_group": "O+",
            "height": 180.0,
            "weight": 81.0,
            "allergies": null,
            "chronic_conditions": null,
            "emergency_contact_name": null,
            "emergency_contact_phone": null,
            "emergency_contact_relation": null
        })
    }

    pub fn availability_row(id: &str, doctor_id: &str, day_of_week: i32, start: &str, end: &str) -> Value {
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "start_time": start,
            "end_time": end,
            "is_available": true,
            "recurring": true,
            "valid_from": "2020-01-01",
            "valid_to": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_number": "APT-20240101-ABC123",
            "appointment_date": date,
            "appointment_time": time,
            "end_time": null,
            "reason": "Checkup",
            "status": status,
            "payment_status": "pending",
            "meeting_link": null,
            "notes": null,
            "is_reminder_sent": false,
            "cancellation_reason": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn notification_row(id: &str, recipient_id: &str, is_read: bool) -> Value {
        json!({
            "id": id,
            "recipient_id": recipient_id,
            "notification_type": "appointment",
            "title": "Appointment booked",
            "message": "Your appointment was booked.",
            "is_read": is_read,
            "related_object_id": null,
            "related_content_type": null,
            "action_url": null,
            "is_deleted": false,
            "deleted_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(!app_config.is_admin_api_configured());
        assert!(TestConfig::default().with_service_key("svc").to_app_config().is_admin_api_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(JwtTestUtils::create_malformed_token().split('.').count(), 3);
    }
}
