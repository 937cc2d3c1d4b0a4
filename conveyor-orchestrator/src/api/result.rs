//! Result API Handlers

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use conveyor_core::dto::result::{ResultPage, ResultQuery, ResultStats};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// GET /api/results?status=&limit=&offset=
pub async fn list_results(
    State(controller): State<AppState>,
    query: Result<Query<ResultQuery>, QueryRejection>,
) -> ApiResult<Json<ResultPage>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    tracing::debug!(
        "Listing results (status: {:?}, limit: {:?}, offset: {:?})",
        query.status,
        query.limit,
        query.offset
    );

    let page = controller.list_results(&query).await?;
    Ok(Json(page))
}

/// GET /api/results/stats
pub async fn get_stats(State(controller): State<AppState>) -> ApiResult<Json<ResultStats>> {
    let stats = controller.result_stats().await?;
    Ok(Json(stats))
}
