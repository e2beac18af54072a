//! Manual job operations: retry, resend, message cancellation.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use uuid::Uuid;

use crate::api::doc::JOB_TAG;
use crate::api::dto::JobResponse;
use crate::error::AppResult;
use crate::state::AppState;

/// Creates job operation routes.
///
/// Routes:
/// - POST /jobs/{id}/retry          - re-deliver a failed job
/// - POST /jobs/{id}/resend         - new delivery for a completed job
/// - POST /messages/{id}/cancel     - cancel a published delayed message
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/{id}/retry", post(retry_job))
        .route("/jobs/{id}/resend", post(resend_job))
        .route("/messages/{message_id}/cancel", post(cancel_message))
}

/// POST /api/jobs/{id}/retry - reset a failed job and publish another
/// attempt.
///
/// Only `failed` jobs can be retried; anything else answers 409 and leaves
/// the job untouched.
#[utoipa::path(
    post,
    path = "/api/jobs/{id}/retry",
    tag = JOB_TAG,
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job re-published", body = JobResponse),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is not in a retryable state")
    )
)]
pub async fn retry_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobResponse>> {
    let job = state.services.scheduler.retry_job(id).await?;
    Ok(Json(JobResponse::from(job)))
}

/// POST /api/jobs/{id}/resend - deliver a completed notification again.
///
/// Completed jobs are never transitioned; the resend creates a new job id
/// in the same batch.
#[utoipa::path(
    post,
    path = "/api/jobs/{id}/resend",
    tag = JOB_TAG,
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 201, description = "New job created and published", body = JobResponse),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is not completed")
    )
)]
pub async fn resend_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<JobResponse>)> {
    let job = state.services.scheduler.resend_job(id).await?;
    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

/// POST /api/messages/{message_id}/cancel - cancel a delayed message before
/// it fires.
///
/// Used for administrative test sends. Persisted job statuses are not
/// altered retroactively.
#[utoipa::path(
    post,
    path = "/api/messages/{message_id}/cancel",
    tag = JOB_TAG,
    params(("message_id" = String, Path, description = "Queue message ID")),
    responses(
        (status = 204, description = "Message cancelled"),
        (status = 502, description = "Queue rejected the cancellation")
    )
)]
pub async fn cancel_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.scheduler.cancel_message(&message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
