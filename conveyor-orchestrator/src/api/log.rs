//! Log API Handlers

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use conveyor_core::dto::log::{LogList, LogQuery};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// GET /api/logs?limit=
pub async fn recent_logs(
    State(controller): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> ApiResult<Json<LogList>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let logs = controller.recent_logs(query.limit).await?;
    Ok(Json(LogList { logs }))
}
