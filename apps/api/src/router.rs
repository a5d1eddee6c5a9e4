use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use doctor_cell::router::{availability_routes, doctor_routes, time_slot_routes};
use medical_record_cell::router::medical_record_routes;
use notification_cell::router::notification_routes;
use payment_cell::router::payment_routes;
use profile_cell::router::profile_routes;
use report_cell::router::{dashboard_routes, report_routes};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Amae Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/profile", profile_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/api/time-slots", time_slot_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/medical-records", medical_record_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state.clone()))
        .nest("/reports", report_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_answers() {
        let app = create_router(TestConfig::default().to_arc());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = create_router(TestConfig::default().to_arc());
        for uri in [
            "/dashboard",
            "/reports",
            "/payments",
            "/medical-records",
            "/notifications",
            "/api/time-slots",
            "/api/time-slots?doctor_id=8d7f0c5e-2f47-4b8e-9a55-0d3c2b1f6a10&date=2099-03-02",
        ] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
