use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use profile_cell::services::user::user_matches;
use profile_cell::services::{ProfileOverviewService, UserService};
use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_models::pagination::{paginate, PageQuery};
use shared_utils::extractor::extract_bearer_token;
use shared_utils::guards::{require_admin, require_any_role, user_uuid};
use shared_utils::jwt::validate_token as decode_token;

use crate::models::{ChangePasswordRequest, LoginRequest, OAuthQuery, RegisterRequest, USERS_PER_PAGE};
use crate::services::AuthService;

// ==============================================================================
// SIGN UP / SIGN IN
// ==============================================================================

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    let (user, session) = AuthService::new(&state).register(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Registration successful. Welcome, {}!", user.username),
        "user": user,
        "session": session,
        "redirect_to": user.role.dashboard_path(),
    })))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let response = AuthService::new(&state).login(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Welcome back, {}!", response.user.username),
        "login": response,
    })))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(&state).logout(auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "You have been logged out.",
    })))
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;

    AuthService::new(&state)
        .change_password(user_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Your password was successfully updated!",
    })))
}

#[axum::debug_handler]
pub async fn oauth_url(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<OAuthQuery>,
) -> Result<Json<Value>, AppError> {
    let provider = query.provider.unwrap_or_else(|| "google".to_string());
    let url = AuthService::new(&state).oauth_url(&provider, &state.oauth_redirect_url)?;

    Ok(Json(json!({
        "provider": provider,
        "url": url,
    })))
}

// ==============================================================================
// TOKENS
// ==============================================================================

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;
    let user = decode_token(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    let role = user.clinic_role().map(|r| r.to_string()).or(user.role);
    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;
    let valid = decode_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let role = require_any_role(&user)?;
    let user_id = user_uuid(&user)?;
    debug!("Loading account for {}", user.id);

    let overview = ProfileOverviewService::new(&state)
        .load(user_id, auth.token())
        .await?;

    Ok(Json(json!({
        "user_id": user.id,
        "role": role,
        "account": overview,
    })))
}

// ==============================================================================
// ADMIN
// ==============================================================================

#[axum::debug_handler]
pub async fn user_list(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let mut users = UserService::new(&state).list_all(auth.token()).await?;
    if let Some(needle) = query.search() {
        users.retain(|u| user_matches(u, needle));
    }
    let page = paginate(users, query.page.as_deref(), USERS_PER_PAGE);

    Ok(Json(json!({
        "users": page,
        "search_query": query.search().unwrap_or_default(),
    })))
}
