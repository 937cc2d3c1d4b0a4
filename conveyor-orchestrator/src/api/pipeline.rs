//! Pipeline API Handlers
//!
//! Start, stop, status and reset of the pipeline.

use axum::{Json, body::Bytes, extract::State};
use conveyor_core::domain::state::PipelineState;
use conveyor_core::dto::pipeline::{PipelineSnapshot, StartRequest, StartResponse, StopResponse};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// GET /api/pipeline/status
pub async fn get_status(State(controller): State<AppState>) -> ApiResult<Json<PipelineSnapshot>> {
    let snapshot = controller.status().await?;
    Ok(Json(snapshot))
}

/// POST /api/pipeline/start
///
/// Body `{ "startIndex": n }`; an empty body starts at 0.
pub async fn start_pipeline(
    State(controller): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<StartResponse>> {
    let req: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid start request: {}", e)))?
    };

    tracing::info!("Start requested at index {}", req.start_index);

    let accepted = controller.start(req.start_index).await?;

    Ok(Json(StartResponse {
        run_id: accepted.run_id,
        start_index: accepted.start_index,
        job_count: accepted.job_count,
        message: format!(
            "Pipeline started at index {} of {}",
            accepted.start_index, accepted.job_count
        ),
    }))
}

/// POST /api/pipeline/stop
pub async fn stop_pipeline(State(controller): State<AppState>) -> ApiResult<Json<StopResponse>> {
    tracing::info!("Stop requested");

    let accepted = controller.stop().await?;

    Ok(Json(StopResponse {
        message: format!(
            "Pipeline stopping at index {}; the current job will finish first",
            accepted.state.current_index
        ),
        state: accepted.state,
    }))
}

/// POST /api/pipeline/reset
pub async fn reset_pipeline(State(controller): State<AppState>) -> ApiResult<Json<PipelineState>> {
    tracing::info!("Reset requested");

    let state = controller.reset().await?;
    Ok(Json(state))
}
