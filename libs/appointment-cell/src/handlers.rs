use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use profile_cell::services::{DoctorProfileService, PatientService};
use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::pagination::PageQuery;
use shared_utils::guards::{require_any_role, require_doctor, require_patient, user_uuid};

use crate::models::{
    AppointmentError, AppointmentScope, AppointmentStatus, BookAppointmentRequest, CancelRequest, RescheduleRequest,
    ReviewRequest, UpdateStatusRequest,
};
use crate::services::{ensure_can_view, AppointmentService, ReviewService};

fn status_choices() -> Value {
    AppointmentStatus::ALL
        .iter()
        .map(|s| json!({ "value": s.as_str(), "label": s.label() }))
        .collect()
}

// ==============================================================================
// PATIENT BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn select_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let service = DoctorService::new(&state);
    let (doctors, specializations) = futures::try_join!(
        service.active_doctors(Some(auth.token())),
        service.list_specializations(Some(auth.token())),
    )?;

    Ok(Json(json!({
        "doctors": doctors,
        "specializations": specializations,
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;
    let user_id = user_uuid(&user)?;

    let patient = PatientService::new(&state)
        .get_or_create_for_user(user_id, auth.token())
        .await
        .map_err(AppointmentError::from)?;

    let service = AppointmentService::new(&state);
    let appointment = service
        .book(&patient, doctor_id, request, Utc::now().naive_utc(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Appointment booked with Dr. {}!", appointment.doctor_name()),
        "appointment": appointment,
    })))
}

// ==============================================================================
// VIEWING
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let role = require_any_role(&user)?;
    let user_id = user_uuid(&user)?;
    let token = auth.token();

    let scope = match role {
        Role::Patient => {
            let patient = PatientService::new(&state)
                .get_or_create_for_user(user_id, token)
                .await
                .map_err(AppointmentError::from)?;
            AppointmentScope::Patient(patient.id)
        }
        Role::Doctor => {
            let doctor = DoctorProfileService::new(&state)
                .get_or_create_for_user(user_id, token)
                .await
                .map_err(AppointmentError::from)?;
            AppointmentScope::Doctor(doctor.id)
        }
        Role::Admin => AppointmentScope::All,
    };

    let service = AppointmentService::new(&state);
    let appointments = service.list(scope, query.search(), token).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "status_choices": status_choices(),
        "search_query": query.search().unwrap_or_default(),
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let role = require_any_role(&user)?;
    let user_id = user_uuid(&user)?;

    let appointment = AppointmentService::new(&state)
        .get(appointment_id, auth.token())
        .await?;
    ensure_can_view(&appointment, user_id, role)?;

    let review = ReviewService::new(&state)
        .for_appointment(appointment.id, auth.token())
        .await?;
    let can_review = role == Role::Patient && appointment.status == AppointmentStatus::Completed && review.is_none();

    Ok(Json(json!({
        "appointment": appointment,
        "review": review,
        "can_review": can_review,
        "status_choices": status_choices(),
    })))
}

// ==============================================================================
// CHANGES
// ==============================================================================

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;
    let user_id = user_uuid(&user)?;
    let status: AppointmentStatus = request.status.parse()?;

    let service = AppointmentService::new(&state);
    let appointment = service.get(appointment_id, auth.token()).await?;
    ensure_can_view(&appointment, user_id, Role::Doctor)?;

    let updated = service
        .update_status(&appointment, status, request.notes, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Appointment status updated to {}.", status.label()),
        "appointment": updated,
    })))
}

#[axum::debug_handler]
pub async fn submit_review(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;
    let user_id = user_uuid(&user)?;

    let appointment = AppointmentService::new(&state)
        .get(appointment_id, auth.token())
        .await?;
    ensure_can_view(&appointment, user_id, Role::Patient)?;

    let review = ReviewService::new(&state)
        .submit(&appointment, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Thank you for your review!",
        "review": review,
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let role = require_any_role(&user)?;
    let user_id = user_uuid(&user)?;

    let service = AppointmentService::new(&state);
    let appointment = service.get(appointment_id, auth.token()).await?;
    ensure_can_view(&appointment, user_id, role)?;

    let updated = service
        .reschedule(&appointment, role, request, Utc::now().naive_utc(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment rescheduled successfully!",
        "appointment": updated,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Value>, AppError> {
    let role = require_any_role(&user)?;
    let user_id = user_uuid(&user)?;

    let service = AppointmentService::new(&state);
    let appointment = service.get(appointment_id, auth.token()).await?;
    ensure_can_view(&appointment, user_id, role)?;

    let updated = service
        .cancel(&appointment, role, request.reason, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled.",
        "appointment": updated,
    })))
}
