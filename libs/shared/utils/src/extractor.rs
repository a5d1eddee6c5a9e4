use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Pull the raw bearer token out of the `Authorization` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;

    let user = validate_token(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderValue, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use shared_models::auth::User;
    use tower::ServiceExt;

    use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn app(config: Arc<AppConfig>) -> Router {
        Router::new()
            .route("/whoami", get(|Extension(user): Extension<User>| async move { user.id }))
            .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
            .with_state(config)
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Token abc"));
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc");
    }

    #[tokio::test]
    async fn middleware_rejects_missing_token() {
        let config = TestConfig::default().to_arc();
        let response = app(config)
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn middleware_injects_user() {
        let test_config = TestConfig::default();
        let user = TestUser::patient("p@example.com");
        let token = JwtTestUtils::create_test_token(&user, &test_config.jwt_secret, Some(1));

        let response = app(test_config.to_arc())
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
