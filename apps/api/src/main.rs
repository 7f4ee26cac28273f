use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use scheduling_cell::{RestSchedulingBackend, SchedulingService, SystemClock};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic Scheduling API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Wire the scheduling facade to the REST backend
    let backend = Arc::new(RestSchedulingBackend::new(&config));
    let clock = Arc::new(SystemClock::new(config.clinic_utc_offset_minutes));
    let scheduler = Arc::new(SchedulingService::from_config(backend, clock, &config));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let port = config.server_port;
    let state = Arc::new(config);

    // Build the application router
    let app = router::create_router(state, scheduler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
