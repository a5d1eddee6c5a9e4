use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::guards::user_uuid;

use crate::services::NotificationService;

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = NotificationService::new(&state);

    let notifications = service.list_for_user(user_id, auth.token()).await?;
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(json!({
        "notifications": notifications,
        "unread_count": unread_count,
    })))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = NotificationService::new(&state);

    let updated = service.mark_read(user_id, notification_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "updated": updated,
    })))
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = NotificationService::new(&state);

    let updated = service.mark_all_read(user_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "updated": updated,
    })))
}

#[axum::debug_handler]
pub async fn delete_notification(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = NotificationService::new(&state);

    service.delete(user_id, notification_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Notification deleted"
    })))
}
