// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Dashboard views
        .route("/", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/schedule", get(handlers::get_schedule))
        .route("/end-time", get(handlers::get_end_time))

        // Single appointment
        .route(
            "/{appointment_id}",
            put(handlers::update_appointment).delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/form", get(handlers::get_appointment_form))
        .route("/{appointment_id}/status", post(handlers::change_status))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
