use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn payment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_payments))
        .route(
            "/appointments/{appointment_id}",
            get(handlers::payment_checkout).post(handlers::process_payment),
        )
        .route("/{payment_id}/success", get(handlers::payment_success))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
