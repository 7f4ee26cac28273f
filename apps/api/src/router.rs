use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use scheduling_cell::{scheduling_routes, SchedulingService};
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>, scheduler: Arc<SchedulingService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Scheduling API is running!" }))
        .nest("/scheduling", scheduling_routes(config, scheduler))
}
