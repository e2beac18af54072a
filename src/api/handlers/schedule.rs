//! Scheduling API handlers.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};

use crate::api::doc::SCHEDULE_TAG;
use crate::api::dto::{BulkScheduleRequest, ScheduleSessionRequest};
use crate::api::extract::ValidatedJson;
use crate::error::AppResult;
use crate::services::{BulkScheduleReport, ScheduleReceipt};
use crate::state::AppState;

/// Creates scheduling routes.
///
/// Routes:
/// - POST /schedule      - schedule one session's notifications
/// - POST /schedule/bulk - schedule many events, isolating per-event errors
pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/schedule", post(schedule_session))
        .route("/schedule/bulk", post(schedule_bulk))
}

/// POST /api/schedule - schedule notifications for one session event.
///
/// Answers 201 with the batch receipt, or 204 when nothing is eligible
/// (event already past, no matching recipients) - a normal skip, not an
/// error. Scheduling over an existing active batch requires `force`.
#[utoipa::path(
    post,
    path = "/api/schedule",
    tag = SCHEDULE_TAG,
    request_body = ScheduleSessionRequest,
    responses(
        (status = 201, description = "Batch created", body = ScheduleReceipt),
        (status = 204, description = "Nothing eligible to schedule"),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Active batch exists and force was not set")
    )
)]
pub async fn schedule_session(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ScheduleSessionRequest>,
) -> AppResult<impl IntoResponse> {
    let force = payload.force;
    let created_by = payload.created_by.clone();
    let event = payload.event.into_event();

    let receipt = state
        .services
        .scheduler
        .schedule_session(&event, created_by, force)
        .await?;

    Ok(match receipt {
        Some(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /api/schedule/bulk - schedule many events.
///
/// One event's scheduling error is recorded in its outcome without aborting
/// the rest.
#[utoipa::path(
    post,
    path = "/api/schedule/bulk",
    tag = SCHEDULE_TAG,
    request_body = BulkScheduleRequest,
    responses(
        (status = 200, description = "Per-event outcomes", body = BulkScheduleReport),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn schedule_bulk(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<BulkScheduleRequest>,
) -> AppResult<Json<BulkScheduleReport>> {
    let events = payload
        .events
        .into_iter()
        .map(|e| e.into_event())
        .collect();

    let report = state
        .services
        .scheduler
        .schedule_many(events, payload.created_by, payload.force)
        .await;

    Ok(Json(report))
}
