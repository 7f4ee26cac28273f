// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::scheduling::SchedulingService;

pub fn scheduling_routes(config: Arc<AppConfig>, scheduler: Arc<SchedulingService>) -> Router {
    let public_routes = Router::new().route("/labels", get(handlers::get_labels));

    let protected_routes = Router::new()
        .route("/providers/{provider_id}/slots", get(handlers::list_provider_slots))
        .route(
            "/appointments",
            post(handlers::book_appointment).get(handlers::list_my_appointments),
        )
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/appointments/{appointment_id}/transition",
            post(handlers::transition_appointment),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(scheduler)
}
