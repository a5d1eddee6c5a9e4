use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/specializations", get(handlers::list_specializations))
        .route("/{doctor_id}", get(handlers::get_doctor));

    let protected_routes = Router::new()
        .route("/", post(handlers::add_doctor))
        .route("/specializations", post(handlers::create_specialization))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_availability).post(handlers::create_availability))
        .route("/{availability_id}", delete(handlers::delete_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn time_slot_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::get_available_time_slots))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
