//! API Module
//!
//! HTTP control surface of the orchestrator.
//! Handlers only parse and format; every operation goes through the controller.

pub mod error;
pub mod health;
pub mod limit;
pub mod log;
pub mod pipeline;
pub mod result;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::limit::{Rate, RateLimiter, RateLimits};
use crate::service::PipelineController;

/// Shared state of every handler
pub type AppState = Arc<PipelineController>;

/// Create the main API router with all endpoints
pub fn create_router(controller: AppState, cors: CorsLayer, limits: &RateLimits) -> Router {
    let status = Router::new().route("/api/pipeline/status", get(pipeline::get_status));

    // Pipeline control
    let control = Router::new()
        .route("/api/pipeline/start", post(pipeline::start_pipeline))
        .route("/api/pipeline/stop", post(pipeline::stop_pipeline))
        .route("/api/pipeline/reset", post(pipeline::reset_pipeline));

    // Read-only listings
    let listing = Router::new()
        .route("/api/results", get(result::list_results))
        .route("/api/results/stats", get(result::get_stats))
        .route("/api/logs", get(log::recent_logs));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .merge(rate_limited(status, limits.status))
        .merge(rate_limited(control, limits.control))
        .merge(rate_limited(listing, limits.listing))
        // Add state and middleware
        .with_state(controller)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn rate_limited(routes: Router<AppState>, rate: Option<Rate>) -> Router<AppState> {
    match rate {
        Some(rate) => routes.route_layer(middleware::from_fn_with_state(
            RateLimiter::new(rate),
            limit::enforce,
        )),
        None => routes,
    }
}

/// CORS policy for the dashboard; any origin when none is configured
pub fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::permissive());
    };

    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid dashboard origin: {}", origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}
