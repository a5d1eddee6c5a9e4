use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use profile_cell::services::DoctorProfileService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::guards::{require_admin, require_doctor, user_uuid};

use crate::models::{
    AddDoctorRequest, CreateAvailabilityRequest, CreateSpecializationRequest, DoctorError, DoctorListQuery,
    TimeSlotQuery,
};
use crate::services::{AvailabilityService, DoctorService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_specializations(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let specializations = service.list_specializations(None).await?;

    Ok(Json(json!({ "specializations": specializations })))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let (doctors, specializations) = futures::try_join!(
        service.list_doctors(&query, None),
        service.list_specializations(None),
    )?;

    Ok(Json(json!({
        "doctors": doctors,
        "specializations": specializations,
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let detail = service.get_doctor_detail(doctor_id, None).await?;

    Ok(Json(json!(detail)))
}

/// `GET /api/time-slots?doctor_id=&date=YYYY-MM-DD`
#[axum::debug_handler]
pub async fn get_available_time_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<TimeSlotQuery>,
) -> Result<Json<Value>, AppError> {
    let (Some(doctor_id), Some(date)) = (query.doctor_id.as_deref(), query.date.as_deref()) else {
        return Err(AppError::BadRequest("Missing parameters".to_string()));
    };

    let doctor_id = Uuid::parse_str(doctor_id.trim())
        .map_err(|_| AppError::BadRequest("Invalid doctor id".to_string()))?;
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid date format. Use YYYY-MM-DD.".to_string()))?;

    debug!("Computing time slots for doctor {} on {}", doctor_id, date);

    let service = AvailabilityService::new(&state);
    let slots = service
        .available_slots(doctor_id, date, Utc::now().naive_utc(), Some(auth.token()))
        .await?;

    Ok(Json(json!({ "slots": slots })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_specialization(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSpecializationRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DoctorService::new(&state);
    let specialization = service.create_specialization(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "specialization": specialization,
    })))
}

#[axum::debug_handler]
pub async fn add_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AddDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DoctorService::new(&state);
    let doctor = service.add_doctor(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Doctor {} added successfully!", doctor.full_name()),
        "doctor": doctor,
    })))
}

// ==============================================================================
// DOCTOR AVAILABILITY HANDLERS
// ==============================================================================

async fn current_doctor_id(state: &AppConfig, user: &User, token: &str) -> Result<Uuid, AppError> {
    require_doctor(user)?;
    let user_id = user_uuid(user)?;
    let doctor = DoctorProfileService::new(state)
        .get_or_create_for_user(user_id, token)
        .await
        .map_err(DoctorError::from)?;
    Ok(doctor.id)
}

#[axum::debug_handler]
pub async fn list_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = current_doctor_id(&state, &user, auth.token()).await?;

    let service = AvailabilityService::new(&state);
    let availabilities = service.list_for_doctor(doctor_id, Some(auth.token())).await?;

    Ok(Json(json!({ "availabilities": availabilities })))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = current_doctor_id(&state, &user, auth.token()).await?;

    let service = AvailabilityService::new(&state);
    let availability = service.create(doctor_id, request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability added successfully!",
        "availability": availability,
    })))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(availability_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = current_doctor_id(&state, &user, auth.token()).await?;

    let service = AvailabilityService::new(&state);
    let removed = service.delete(doctor_id, availability_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} availability removed.", removed.day_name()),
    })))
}
