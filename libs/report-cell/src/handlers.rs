use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use profile_cell::services::{DoctorProfileService, PatientService};
use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::guards::{require_admin, require_any_role, user_uuid};

use crate::models::{Dashboard, ReportError, ReportQuery};
use crate::services::{DashboardService, ReportService};

#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let role = require_any_role(&user)?;
    let user_id = user_uuid(&user)?;
    let token = auth.token();
    let today = Utc::now().date_naive();
    let service = DashboardService::new(&state);

    let dashboard = match role {
        Role::Patient => {
            let patient = PatientService::new(&state)
                .get_or_create_for_user(user_id, token)
                .await
                .map_err(ReportError::from)?;
            Dashboard::Patient(service.for_patient(patient, user_id, today, token).await?)
        }
        Role::Doctor => {
            let doctor = DoctorProfileService::new(&state)
                .get_or_create_for_user(user_id, token)
                .await
                .map_err(ReportError::from)?;
            Dashboard::Doctor(service.for_doctor(doctor, user_id, today, token).await?)
        }
        Role::Admin => Dashboard::Admin(service.for_admin(token).await?),
    };

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn generate_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    // No criteria yet: describe the form instead.
    if query.report_type.is_none() && query.date_range.is_none() {
        return Ok(Json(json!({
            "report_types": [
                { "value": "appointments", "label": "Appointments Report" },
                { "value": "payments", "label": "Payments Report" },
            ],
            "date_ranges": [
                { "value": "today", "label": "Today" },
                { "value": "this_week", "label": "This Week" },
                { "value": "this_month", "label": "This Month" },
                { "value": "this_year", "label": "This Year" },
                { "value": "custom", "label": "Custom Date Range" },
            ],
        })));
    }

    let report_type = query.report_type()?;
    let (start, end) = query.resolve_dates(Utc::now().date_naive())?;

    let report = ReportService::new(&state)
        .generate(report_type, start, end, query.search(), auth.token())
        .await?;

    Ok(Json(json!({
        "report_type": report_type,
        "date_range": query.date_range()?,
        "search_query": query.search().unwrap_or_default(),
        "report": report,
    })))
}
