//! Maintenance operations: aggregate repair and the reconciliation sweep.
//!
//! Both also run periodically via the in-process maintenance scheduler;
//! these endpoints exist for on-demand repair after deploys or incidents.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::doc::MAINTENANCE_TAG;
use crate::api::dto::BatchStatusResponse;
use crate::error::AppResult;
use crate::state::AppState;

/// POST /api/maintenance/reconcile response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    /// Pending jobs found past their send time with no queue message.
    pub examined: usize,
    /// How many of them were re-published.
    pub republished: usize,
}

/// POST /api/maintenance/recalculate response.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecalculateResponse {
    pub batches: usize,
}

/// Creates maintenance routes.
///
/// Routes:
/// - POST /batches/{id}/recalculate  - repair one batch's aggregate
/// - POST /maintenance/recalculate   - repair every active batch
/// - POST /maintenance/reconcile     - re-publish orphaned pending jobs
pub fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/batches/{id}/recalculate", post(recalculate_batch))
        .route("/maintenance/recalculate", post(recalculate_active))
        .route("/maintenance/reconcile", post(reconcile))
}

/// POST /api/batches/{id}/recalculate - recompute one batch's roll-up.
#[utoipa::path(
    post,
    path = "/api/batches/{id}/recalculate",
    tag = MAINTENANCE_TAG,
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Recomputed batch", body = BatchStatusResponse),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn recalculate_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BatchStatusResponse>> {
    let batch = state.services.aggregator.recompute(id).await?;
    Ok(Json(BatchStatusResponse::from(batch)))
}

/// POST /api/maintenance/recalculate - recompute every active batch.
#[utoipa::path(
    post,
    path = "/api/maintenance/recalculate",
    tag = MAINTENANCE_TAG,
    responses(
        (status = 200, description = "Batches recalculated", body = RecalculateResponse)
    )
)]
pub async fn recalculate_active(
    State(state): State<AppState>,
) -> AppResult<Json<RecalculateResponse>> {
    let batches = state.services.aggregator.recalculate_active().await?;
    Ok(Json(RecalculateResponse { batches }))
}

/// POST /api/maintenance/reconcile - re-publish pending jobs whose publish
/// was interrupted.
#[utoipa::path(
    post,
    path = "/api/maintenance/reconcile",
    tag = MAINTENANCE_TAG,
    responses(
        (status = 200, description = "Sweep summary", body = ReconcileResponse)
    )
)]
pub async fn reconcile(State(state): State<AppState>) -> AppResult<Json<ReconcileResponse>> {
    let (examined, republished) = state.services.scheduler.reconcile_unpublished().await?;
    Ok(Json(ReconcileResponse {
        examined,
        republished,
    }))
}
