use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use axum_extra::TypedHeader;
use chrono::NaiveTime;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::handlers::*;
use doctor_cell::models::{AddDoctorRequest, CreateAvailabilityRequest, DoctorListQuery, TimeSlotQuery};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

fn create_test_config(server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_url(&server.uri()).to_arc()
}

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

fn slot_query(doctor_id: Option<String>, date: Option<&str>) -> Query<TimeSlotQuery> {
    Query(TimeSlotQuery {
        doctor_id,
        date: date.map(str::to_string),
    })
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn mount_own_doctor(server: &MockServer, user_id: &str, doctor_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(doctor_id, user_id)
        ])))
        .mount(server)
        .await;
}

// ==============================================================================
// TIME SLOTS
// ==============================================================================

#[tokio::test]
async fn time_slots_require_both_parameters() {
    let server = MockServer::start().await;

    let result = get_available_time_slots(
        State(create_test_config(&server)),
        create_auth_header("patient_token"),
        slot_query(Some(Uuid::new_v4().to_string()), None),
    )
    .await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "Missing parameters");
}

#[tokio::test]
async fn time_slots_reject_malformed_date() {
    let server = MockServer::start().await;

    let result = get_available_time_slots(
        State(create_test_config(&server)),
        create_auth_header("patient_token"),
        slot_query(Some(Uuid::new_v4().to_string()), Some("02/03/2099")),
    )
    .await;

    assert_matches!(result, Err(AppError::BadRequest(_)));
}

#[tokio::test]
async fn time_slots_for_unknown_doctor_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = get_available_time_slots(
        State(create_test_config(&server)),
        create_auth_header("patient_token"),
        slot_query(Some(Uuid::new_v4().to_string()), Some("2099-03-02")),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn time_slots_skip_booked_times() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": doctor_id }])))
        .mount(&server)
        .await;

    // 2099-03-02 is a Monday.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availabilities"))
        .and(query_param("day_of_week", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_row(&Uuid::new_v4().to_string(), &doctor_id, 0, "09:00:00", "10:30:00")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_date", "eq.2099-03-02"))
        .and(query_param("status", "in.(pending,confirmed,rescheduled)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "appointment_time": "09:30:00" }
        ])))
        .mount(&server)
        .await;

    let Json(body) = get_available_time_slots(
        State(create_test_config(&server)),
        create_auth_header("patient_token"),
        slot_query(Some(doctor_id), Some("2099-03-02")),
    )
    .await
    .unwrap();

    let slots = body["slots"].as_array().unwrap();
    let starts: Vec<&str> = slots.iter().map(|s| s["start"].as_str().unwrap()).collect();
    assert_eq!(starts, vec!["09:00", "10:00"]);
    assert_eq!(slots[1]["formatted"], "10:00 AM");
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[tokio::test]
async fn overlapping_availability_is_rejected() {
    let server = MockServer::start().await;
    let user = TestUser::doctor("doc@example.com").to_user();
    let doctor_id = Uuid::new_v4().to_string();
    mount_own_doctor(&server, &user.id, &doctor_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_row(&Uuid::new_v4().to_string(), &doctor_id, 2, "09:00:00", "12:00:00")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availabilities"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreateAvailabilityRequest {
        day_of_week: 2,
        start_time: t(11, 0),
        end_time: t(13, 0),
        is_available: None,
        recurring: None,
        valid_from: None,
        valid_to: None,
    };

    let result = create_availability(
        State(create_test_config(&server)),
        create_auth_header("token"),
        Extension(user),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("overlaps"));
}

#[tokio::test]
async fn availability_with_end_before_start_is_invalid() {
    let server = MockServer::start().await;
    let user = TestUser::doctor("doc@example.com").to_user();
    mount_own_doctor(&server, &user.id, &Uuid::new_v4().to_string()).await;

    let request = CreateAvailabilityRequest {
        day_of_week: 7,
        start_time: t(14, 0),
        end_time: t(9, 0),
        is_available: None,
        recurring: None,
        valid_from: None,
        valid_to: None,
    };

    let result = create_availability(
        State(create_test_config(&server)),
        create_auth_header("token"),
        Extension(user),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(msg)) if msg.contains("day_of_week") && msg.contains("start_time"));
}

#[tokio::test]
async fn deleting_another_doctors_window_is_not_found() {
    let server = MockServer::start().await;
    let user = TestUser::doctor("doc@example.com").to_user();
    mount_own_doctor(&server, &user.id, &Uuid::new_v4().to_string()).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let result = delete_availability(
        State(create_test_config(&server)),
        create_auth_header("token"),
        Extension(user),
        Path(Uuid::new_v4()),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn patients_cannot_manage_availability() {
    let server = MockServer::start().await;
    let user = TestUser::patient("p@example.com").to_user();

    let result = list_availability(
        State(create_test_config(&server)),
        create_auth_header("token"),
        Extension(user),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

// ==============================================================================
// LISTING AND ADMIN
// ==============================================================================

#[tokio::test]
async fn doctor_list_filters_by_name_and_attaches_rating() {
    let server = MockServer::start().await;
    let house_id = Uuid::new_v4().to_string();
    let wilson_id = Uuid::new_v4().to_string();

    let mut house = MockSupabaseResponses::doctor_row(&house_id, &Uuid::new_v4().to_string());
    house["user"] = json!({ "username": "house", "first_name": "Gregory", "last_name": "House", "email": "h@example.com" });
    house["specializations"] = json!([]);
    let mut wilson = MockSupabaseResponses::doctor_row(&wilson_id, &Uuid::new_v4().to_string());
    wilson["user"] = json!({ "username": "wilson", "first_name": "James", "last_name": "Wilson", "email": "w@example.com" });
    wilson["specializations"] = json!([]);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("experience_years", "gte.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([house, wilson])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": house_id, "rating": 5 },
            { "doctor_id": house_id, "rating": 4 }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/specializations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let query = DoctorListQuery {
        name: Some("house".into()),
        min_experience: Some(5),
        ..Default::default()
    };

    let Json(body) = list_doctors(State(create_test_config(&server)), Query(query)).await.unwrap();

    let items = body["doctors"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["full_name"], "Gregory House");
    assert_eq!(items[0]["average_rating"], 4.5);
    assert_eq!(body["doctors"]["total"], 1);
}

fn review_row(doctor_id: &str, rating: i32, anonymous: bool) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "appointment_id": Uuid::new_v4(),
        "doctor_id": doctor_id,
        "patient_id": Uuid::new_v4(),
        "rating": rating,
        "comment": null,
        "doctor_response": null,
        "is_anonymous": anonymous,
        "created_at": "2024-02-01T00:00:00Z",
        "patient": { "user": { "username": "jdoe", "first_name": "Jane", "last_name": "Doe" } }
    })
}

#[tokio::test]
async fn doctor_detail_reports_plain_mean_and_hides_anonymous_reviewers() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();

    let mut house = MockSupabaseResponses::doctor_row(&doctor_id, &Uuid::new_v4().to_string());
    house["user"] = json!({ "username": "house", "first_name": "Gregory", "last_name": "House", "email": "h@example.com" });
    house["specializations"] = json!([]);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([house])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_row(&Uuid::new_v4().to_string(), &doctor_id, 0, "09:00:00", "12:00:00")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            review_row(&doctor_id, 5, true),
            review_row(&doctor_id, 5, false),
            review_row(&doctor_id, 4, false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let Json(body) = get_doctor(
        State(create_test_config(&server)),
        Path(Uuid::parse_str(&doctor_id).unwrap()),
    )
    .await
    .unwrap();

    let average = body["doctor"]["average_rating"].as_f64().unwrap();
    assert!((average - 14.0 / 3.0).abs() < 1e-9);
    assert_eq!(body["review_count"], 3);
    assert_eq!(body["reviews"][0]["reviewer_name"], "Anonymous");
    assert_eq!(body["reviews"][1]["reviewer_name"], "Jane Doe");
    assert_eq!(body["availability"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_doctor_detail_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = get_doctor(State(create_test_config(&server)), Path(Uuid::new_v4())).await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn only_admins_add_doctors() {
    let server = MockServer::start().await;
    let user = TestUser::patient("p@example.com").to_user();

    let request = AddDoctorRequest {
        username: "drnew".into(),
        email: "new@example.com".into(),
        password: "Sturdy-Pass-99".into(),
        first_name: "New".into(),
        last_name: "Doctor".into(),
        specialization_id: Uuid::new_v4(),
        license_number: "LIC-1".into(),
        experience_years: 3,
        consultation_fee: 80.0,
        clinic_address: "2 Side Street".into(),
    };

    let result = add_doctor(
        State(create_test_config(&server)),
        create_auth_header("token"),
        Extension(user),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}
