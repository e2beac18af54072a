//! Read-only status query handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::api::doc::STATUS_TAG;
use crate::api::dto::{
    DeadLetterParams, DeadLetterResponse, JobResponse, StatusQueryParams, StatusResponse,
};
use crate::error::AppResult;
use crate::state::AppState;

const DEFAULT_DEAD_LETTER_LIMIT: i64 = 100;

/// Creates status query routes.
///
/// Routes:
/// - GET /status             - batch summaries by one filter
/// - GET /batches/{id}/jobs  - job-level progress for one batch
/// - GET /dead-letters       - failure audit listing
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(query_status))
        .route("/batches/{id}/jobs", get(list_batch_jobs))
        .route("/dead-letters", get(list_dead_letters))
}

/// GET /api/status - batch progress for the polling clients.
///
/// Exactly one of `batch_id`, `session_id`, `created_by`, `active` must be
/// set. The response includes the suggested poll interval and the grace
/// window for terminal batches.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = STATUS_TAG,
    params(StatusQueryParams),
    responses(
        (status = 200, description = "Batch summaries", body = StatusResponse),
        (status = 400, description = "Zero or multiple filters set"),
        (status = 404, description = "Unknown batch id")
    )
)]
pub async fn query_status(
    State(state): State<AppState>,
    Query(params): Query<StatusQueryParams>,
) -> AppResult<Json<StatusResponse>> {
    let batches = state.services.status.query(params.into()).await?;
    Ok(Json(StatusResponse::new(batches)))
}

/// GET /api/batches/{id}/jobs - per-job progress inside one batch.
#[utoipa::path(
    get,
    path = "/api/batches/{id}/jobs",
    tag = STATUS_TAG,
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Jobs in send order", body = Vec<JobResponse>),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn list_batch_jobs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<JobResponse>>> {
    let jobs = state.services.status.batch_jobs(id).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

/// GET /api/dead-letters - audit listing of terminal delivery failures.
#[utoipa::path(
    get,
    path = "/api/dead-letters",
    tag = STATUS_TAG,
    params(DeadLetterParams),
    responses(
        (status = 200, description = "Dead-letter entries, newest first", body = Vec<DeadLetterResponse>)
    )
)]
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(params): Query<DeadLetterParams>,
) -> AppResult<Json<Vec<DeadLetterResponse>>> {
    let limit = params.limit.unwrap_or(DEFAULT_DEAD_LETTER_LIMIT).clamp(1, 1000);
    let entries = state
        .services
        .status
        .dead_letters(params.batch_id, limit)
        .await?;
    Ok(Json(entries.into_iter().map(DeadLetterResponse::from).collect()))
}
