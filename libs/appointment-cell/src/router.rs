use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/select-doctor", get(handlers::select_doctor))
        .route("/book/{doctor_id}", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", post(handlers::update_status))
        .route("/{appointment_id}/review", post(handlers::submit_review))
        .route("/{appointment_id}/reschedule", post(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
