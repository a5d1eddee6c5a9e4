use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use appointment_cell::services::{ensure_can_view as ensure_appointment_participant, AppointmentService};
use profile_cell::services::{DoctorProfileService, PatientService};
use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::pagination::{paginate, PageQuery};
use shared_utils::guards::{require_any_role, require_doctor, user_uuid};

use crate::models::{
    CreateMedicalRecordRequest, CreatePrescriptionRequest, MedicalRecordError, RecordScope, RECORDS_PER_PAGE,
};
use crate::services::{ensure_can_view, MedicalRecordService};

#[axum::debug_handler]
pub async fn create_medical_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CreateMedicalRecordRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;
    let user_id = user_uuid(&user)?;

    let appointment = AppointmentService::new(&state)
        .get(appointment_id, auth.token())
        .await?;
    ensure_appointment_participant(&appointment, user_id, Role::Doctor)?;

    let record = MedicalRecordService::new(&state)
        .create(&appointment, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Medical record created successfully.",
        "record": record,
    })))
}

#[axum::debug_handler]
pub async fn list_medical_records(
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
                .map_err(MedicalRecordError::from)?;
            RecordScope::Patient(patient.id)
        }
        Role::Doctor => {
            let doctor = DoctorProfileService::new(&state)
                .get_or_create_for_user(user_id, token)
                .await
                .map_err(MedicalRecordError::from)?;
            RecordScope::Doctor(doctor.id)
        }
        Role::Admin => RecordScope::All,
    };

    let records = MedicalRecordService::new(&state).list(scope, token).await?;
    let page = paginate(records, query.page.as_deref(), RECORDS_PER_PAGE);

    Ok(Json(json!({ "records": page })))
}

#[axum::debug_handler]
pub async fn get_medical_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let role = require_any_role(&user)?;
    let user_id = user_uuid(&user)?;

    let service = MedicalRecordService::new(&state);
    let record = service.get(record_id, auth.token()).await?;
    ensure_can_view(&record, user_id, role)?;

    let prescription = service.prescription_for(record.id, auth.token()).await?;

    Ok(Json(json!({
        "record": record,
        "prescription": prescription,
    })))
}

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(record_id): Path<Uuid>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;
    let user_id = user_uuid(&user)?;

    let service = MedicalRecordService::new(&state);
    let record = service.get(record_id, auth.token()).await?;
    ensure_can_view(&record, user_id, Role::Doctor)?;

    let prescription = service
        .create_prescription(&record, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Prescription created successfully.",
        "prescription": prescription,
    })))
}
