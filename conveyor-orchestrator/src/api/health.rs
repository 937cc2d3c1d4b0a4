//! Health Check API Handler

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use conveyor_core::dto::pipeline::HealthReport;

use crate::api::AppState;

/// GET /health
/// Reports whether the state store answers
pub async fn health_check(State(controller): State<AppState>) -> impl IntoResponse {
    match controller.status().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(HealthReport {
                status: "healthy".to_string(),
                store_reachable: true,
                is_running: snapshot.state.is_running,
                timestamp: Utc::now(),
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    status: "unhealthy".to_string(),
                    store_reachable: false,
                    is_running: controller.is_active().await,
                    timestamp: Utc::now(),
                }),
            )
        }
    }
}
