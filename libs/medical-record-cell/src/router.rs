use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn medical_record_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_medical_records))
        .route("/appointments/{appointment_id}", post(handlers::create_medical_record))
        .route("/{record_id}", get(handlers::get_medical_record))
        .route("/{record_id}/prescription", post(handlers::create_prescription))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
