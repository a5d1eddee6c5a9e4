use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medical_record_cell::handlers::*;
use medical_record_cell::models::{CreateMedicalRecordRequest, CreatePrescriptionRequest};
use shared_config::AppConfig;
use shared_models::{auth::User, error::AppError, pagination::PageQuery};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

fn create_test_config(server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_url(&server.uri()).to_arc()
}

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

struct Visit {
    patient_user: User,
    doctor_user: User,
    patient_id: String,
    doctor_id: String,
    appointment_id: String,
}

impl Visit {
    fn new() -> Self {
        Self {
            patient_user: TestUser::patient("jdoe@example.com").to_user(),
            doctor_user: TestUser::doctor("house@example.com").to_user(),
            patient_id: Uuid::new_v4().to_string(),
            doctor_id: Uuid::new_v4().to_string(),
            appointment_id: Uuid::new_v4().to_string(),
        }
    }

    fn participants(&self) -> (Value, Value) {
        (
            json!({
                "id": self.patient_id,
                "user_id": self.patient_user.id,
                "user": { "username": "jdoe", "first_name": "Jane", "last_name": "Doe" }
            }),
            json!({
                "id": self.doctor_id,
                "user_id": self.doctor_user.id,
                "user": { "username": "house", "first_name": "Gregory", "last_name": "House" }
            }),
        )
    }

    fn appointment(&self) -> Value {
        let mut row = MockSupabaseResponses::appointment_row(
            &self.appointment_id,
            &self.patient_id,
            &self.doctor_id,
            "2024-05-01",
            "10:00:00",
            "completed",
        );
        let (patient, doctor) = self.participants();
        row["patient"] = patient;
        row["doctor"] = doctor;
        row
    }

    fn record(&self, record_id: &str) -> Value {
        let (patient, doctor) = self.participants();
        json!({
            "id": record_id,
            "patient_id": self.patient_id,
            "doctor_id": self.doctor_id,
            "appointment_id": self.appointment_id,
            "record_type": "diagnosis",
            "title": "Consultation on 2024-05-01",
            "diagnosis": "Seasonal flu",
            "symptoms": "Fever",
            "prescription": null,
            "treatment": "Rest",
            "notes": null,
            "document_url": null,
            "is_shared": false,
            "created_at": "2024-05-01T10:30:00Z",
            "updated_at": "2024-05-01T10:30:00Z",
            "patient": patient,
            "doctor": doctor
        })
    }

    async fn mount_appointment(&self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("id", format!("eq.{}", self.appointment_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([self.appointment()])))
            .mount(server)
            .await;
    }

    async fn mount_record(&self, server: &MockServer, record_id: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/medical_records"))
            .and(query_param("id", format!("eq.{}", record_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([self.record(record_id)])))
            .mount(server)
            .await;
    }
}

// ==============================================================================
// CREATING RECORDS
// ==============================================================================

#[tokio::test]
async fn test_create_record_defaults_title_and_notifies_patient() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();
    let record_id = Uuid::new_v4().to_string();

    visit.mount_appointment(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("appointment_id", format!("eq.{}", visit.appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let mut created = visit.record(&record_id);
    created.as_object_mut().unwrap().remove("patient");
    created.as_object_mut().unwrap().remove("doctor");
    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([created])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_row(&Uuid::new_v4().to_string(), &visit.patient_user.id, false)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = CreateMedicalRecordRequest {
        diagnosis: Some("Seasonal flu".into()),
        ..Default::default()
    };

    let result = create_medical_record(
        State(config),
        create_auth_header("doctor_token"),
        Extension(visit.doctor_user.clone()),
        Path(Uuid::parse_str(&visit.appointment_id).unwrap()),
        Json(request),
    )
    .await;

    let body = result.unwrap().0;
    assert_eq!(body["record"]["title"], "Consultation on 2024-05-01");
    assert_eq!(body["record"]["patient"]["user_id"], json!(visit.patient_user.id));
}

#[tokio::test]
async fn test_second_record_for_appointment_conflicts() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();

    visit.mount_appointment(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("appointment_id", format!("eq.{}", visit.appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            visit.record(&Uuid::new_v4().to_string())
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = create_medical_record(
        State(config),
        create_auth_header("doctor_token"),
        Extension(visit.doctor_user.clone()),
        Path(Uuid::parse_str(&visit.appointment_id).unwrap()),
        Json(CreateMedicalRecordRequest::default()),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn test_other_doctor_cannot_write_record() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();

    visit.mount_appointment(&mock_server).await;

    let result = create_medical_record(
        State(config),
        create_auth_header("doctor_token"),
        Extension(TestUser::doctor("wilson@example.com").to_user()),
        Path(Uuid::parse_str(&visit.appointment_id).unwrap()),
        Json(CreateMedicalRecordRequest::default()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_record_rejects_unknown_document_type() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();

    visit.mount_appointment(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = CreateMedicalRecordRequest {
        document_url: Some("https://files.example.com/scan.exe".into()),
        ..Default::default()
    };

    let result = create_medical_record(
        State(config),
        create_auth_header("doctor_token"),
        Extension(visit.doctor_user.clone()),
        Path(Uuid::parse_str(&visit.appointment_id).unwrap()),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg.starts_with("document:"));
}

// ==============================================================================
// VIEWING
// ==============================================================================

#[tokio::test]
async fn test_patient_lists_own_records() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", format!("eq.{}", visit.patient_user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&visit.patient_id, &visit.patient_user.id)
        ])))
        .mount(&mock_server)
        .await;

    let records: Vec<Value> = (0..12).map(|_| visit.record(&Uuid::new_v4().to_string())).collect();
    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("patient_id", format!("eq.{}", visit.patient_id)))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(records)))
        .mount(&mock_server)
        .await;

    let result = list_medical_records(
        State(config),
        create_auth_header("patient_token"),
        Extension(visit.patient_user.clone()),
        Query(PageQuery { page: Some("2".into()), q: None }),
    )
    .await;

    let body = result.unwrap().0;
    assert_eq!(body["records"]["total"], 12);
    assert_eq!(body["records"]["page"], 2);
    assert_eq!(body["records"]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_record_detail_includes_prescription() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();
    let record_id = Uuid::new_v4().to_string();

    visit.mount_record(&mock_server, &record_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("medical_record_id", format!("eq.{}", record_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "medical_record_id": record_id,
            "medicines": [{ "name": "Paracetamol", "dose": "500mg" }],
            "instructions": "Twice daily after meals",
            "refill_info": null,
            "valid_until": "2024-06-01",
            "is_digital": true,
            "digital_signature": null,
            "created_at": "2024-05-01T10:45:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let result = get_medical_record(
        State(config),
        create_auth_header("patient_token"),
        Extension(visit.patient_user.clone()),
        Path(Uuid::parse_str(&record_id).unwrap()),
    )
    .await;

    let body = result.unwrap().0;
    assert_eq!(body["record"]["diagnosis"], "Seasonal flu");
    assert_eq!(body["prescription"]["medicines"][0]["name"], "Paracetamol");
}

#[tokio::test]
async fn test_stranger_cannot_view_record() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();
    let record_id = Uuid::new_v4().to_string();

    visit.mount_record(&mock_server, &record_id).await;

    let result = get_medical_record(
        State(config),
        create_auth_header("patient_token"),
        Extension(TestUser::patient("someone@example.com").to_user()),
        Path(Uuid::parse_str(&record_id).unwrap()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(msg)) if msg == "You do not have permission to view this record.");
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[tokio::test]
async fn test_prescription_needs_named_medicines() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();
    let record_id = Uuid::new_v4().to_string();

    visit.mount_record(&mock_server, &record_id).await;

    let request = CreatePrescriptionRequest {
        medicines: json!([{ "dose": "500mg" }]),
        instructions: "Twice daily".into(),
        refill_info: None,
        valid_until: None,
    };

    let result = create_prescription(
        State(config),
        create_auth_header("doctor_token"),
        Extension(visit.doctor_user.clone()),
        Path(Uuid::parse_str(&record_id).unwrap()),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg == "Medicine #1 needs a name.");
}

#[tokio::test]
async fn test_second_prescription_conflicts() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server);
    let visit = Visit::new();
    let record_id = Uuid::new_v4().to_string();

    visit.mount_record(&mock_server, &record_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "medical_record_id": record_id,
            "medicines": [{ "name": "Paracetamol" }],
            "instructions": "Once daily",
            "refill_info": null,
            "valid_until": null,
            "is_digital": true,
            "digital_signature": null,
            "created_at": null
        }])))
        .mount(&mock_server)
        .await;

    let request = CreatePrescriptionRequest {
        medicines: json!([{ "name": "Ibuprofen" }]),
        instructions: "Every 8 hours".into(),
        refill_info: None,
        valid_until: None,
    };

    let result = create_prescription(
        State(config),
        create_auth_header("doctor_token"),
        Extension(visit.doctor_user.clone()),
        Path(Uuid::parse_str(&record_id).unwrap()),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}
