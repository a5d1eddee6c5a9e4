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

use appointment_cell::models::Appointment;
use appointment_cell::services::{ensure_can_view, AppointmentService};
use profile_cell::services::DoctorProfileService;
use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::pagination::{paginate, PageQuery};
use shared_utils::guards::{require_doctor_or_admin, require_patient, user_uuid};

use crate::models::{CardDetails, PaymentError, PaymentScope, PAYMENTS_PER_PAGE};
use crate::services::PaymentService;

async fn own_appointment(
    state: &AppConfig,
    user: &User,
    appointment_id: Uuid,
    auth_token: &str,
) -> Result<Appointment, AppError> {
    require_patient(user)?;
    let user_id = user_uuid(user)?;

    let appointment = AppointmentService::new(state).get(appointment_id, auth_token).await?;
    ensure_can_view(&appointment, user_id, Role::Patient)?;
    Ok(appointment)
}

#[axum::debug_handler]
pub async fn payment_checkout(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = own_appointment(&state, &user, appointment_id, auth.token()).await?;

    let payment = PaymentService::new(&state)
        .get_or_create(&appointment, auth.token())
        .await?;

    Ok(Json(json!({
        "appointment": appointment,
        "payment": payment,
    })))
}

#[axum::debug_handler]
pub async fn process_payment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(card): Json<CardDetails>,
) -> Result<Json<Value>, AppError> {
    let appointment = own_appointment(&state, &user, appointment_id, auth.token()).await?;

    let payment = PaymentService::new(&state)
        .process(&appointment, &card, Utc::now(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment successful!",
        "payment": payment,
    })))
}

#[axum::debug_handler]
pub async fn payment_success(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;
    let user_id = user_uuid(&user)?;

    let payment = PaymentService::new(&state).get(payment_id, auth.token()).await?;
    // Someone else's payment looks the same as a missing one.
    if payment.patient_user_id() != Some(user_id) {
        return Err(PaymentError::NotFound.into());
    }

    Ok(Json(json!({ "payment": payment })))
}

#[axum::debug_handler]
pub async fn list_payments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let role = require_doctor_or_admin(&user)?;
    let token = auth.token();

    let scope = match role {
        Role::Doctor => {
            let doctor = DoctorProfileService::new(&state)
                .get_or_create_for_user(user_uuid(&user)?, token)
                .await
                .map_err(PaymentError::from)?;
            PaymentScope::Doctor(doctor.id)
        }
        _ => PaymentScope::All,
    };

    let payments = PaymentService::new(&state)
        .list(scope, query.search(), token)
        .await?;
    let page = paginate(payments, query.page.as_deref(), PAYMENTS_PER_PAGE);

    Ok(Json(json!({
        "payments": page,
        "search_query": query.search().unwrap_or_default(),
    })))
}
