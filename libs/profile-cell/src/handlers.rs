use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::guards::user_uuid;

use crate::models::UpdateProfileRequest;
use crate::services::ProfileOverviewService;

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = ProfileOverviewService::new(&state);

    let overview = service.load(user_id, auth.token()).await?;

    Ok(Json(json!(overview)))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = ProfileOverviewService::new(&state);

    let overview = service.update(user_id, request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully!",
        "profile": overview,
    })))
}
