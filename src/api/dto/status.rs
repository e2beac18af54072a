//! Status query DTOs and the polling contract.
//!
//! The status surface is designed for a client-side adaptive poller: poll at
//! the short interval while any tracked batch is non-terminal, drop to the
//! long interval once all are terminal, and keep terminal batches visible
//! for the grace window before dropping them from the tracked set so the UI
//! does not flicker. The response carries the contract values so clients do
//! not hardcode them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{
    BatchStatus, DeadLetterEntry, JobStatus, JobType, NotificationBatch, NotificationJob,
};
use crate::services::StatusQuery;

/// Poll interval while any tracked batch is pending or in progress.
pub const POLL_INTERVAL_ACTIVE_SECONDS: u64 = 5;
/// Poll interval once every tracked batch is terminal.
pub const POLL_INTERVAL_IDLE_SECONDS: u64 = 60;
/// How long clients should keep showing a terminal batch before dropping it.
pub const TERMINAL_GRACE_SECONDS: u64 = 30;

/// GET /api/status query parameters. Exactly one filter must be set.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQueryParams {
    pub batch_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub active: Option<bool>,
}

impl From<StatusQueryParams> for StatusQuery {
    fn from(params: StatusQueryParams) -> Self {
        StatusQuery {
            batch_id: params.batch_id,
            session_id: params.session_id,
            created_by: params.created_by,
            active: params.active,
        }
    }
}

/// One batch summary with counts.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchStatusResponse {
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub status: BatchStatus,
    pub total: i32,
    pub completed: i32,
    pub failed: i32,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: NaiveDateTime,
}

impl From<NotificationBatch> for BatchStatusResponse {
    fn from(batch: NotificationBatch) -> Self {
        Self {
            batch_id: batch.id,
            session_id: batch.session_id,
            kind: batch.kind,
            created_by: batch.created_by,
            status: batch.status,
            total: batch.total,
            completed: batch.completed,
            failed: batch.failed,
            created_at: batch.created_at,
            updated_at: batch.updated_at,
        }
    }
}

/// GET /api/status response: summaries plus the polling contract.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub batches: Vec<BatchStatusResponse>,
    pub active_count: usize,
    pub suggested_poll_seconds: u64,
    pub terminal_grace_seconds: u64,
}

impl StatusResponse {
    pub fn new(batches: Vec<NotificationBatch>) -> Self {
        let active_count = batches.iter().filter(|b| !b.status.is_terminal()).count();
        let suggested_poll_seconds = if active_count > 0 {
            POLL_INTERVAL_ACTIVE_SECONDS
        } else {
            POLL_INTERVAL_IDLE_SECONDS
        };
        Self {
            batches: batches.into_iter().map(BatchStatusResponse::from).collect(),
            active_count,
            suggested_poll_seconds,
            terminal_grace_seconds: TERMINAL_GRACE_SECONDS,
        }
    }
}

/// One job, as returned by the manual retry/resend operations.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub status: JobStatus,
    pub attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub scheduled_for: NaiveDateTime,
}

impl From<NotificationJob> for JobResponse {
    fn from(job: NotificationJob) -> Self {
        Self {
            job_id: job.id,
            batch_id: job.batch_id,
            session_id: job.session_id,
            job_type: job.job_type,
            recipient_email: job.recipient_email,
            status: job.status,
            attempts: job.attempts,
            external_message_id: job.external_message_id,
            provider_message_id: job.provider_message_id,
            last_error: job.last_error,
            scheduled_for: job.scheduled_for,
        }
    }
}

/// GET /api/dead-letters query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeadLetterParams {
    pub batch_id: Option<Uuid>,
    /// Maximum entries returned, newest first. Defaults to 100.
    pub limit: Option<i64>,
}

/// One dead-letter audit entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeadLetterResponse {
    pub id: i64,
    pub job_id: Uuid,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub attempts: i32,
    pub error_message: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: NaiveDateTime,
}

impl From<DeadLetterEntry> for DeadLetterResponse {
    fn from(entry: DeadLetterEntry) -> Self {
        Self {
            id: entry.id,
            job_id: entry.job_id,
            batch_id: entry.batch_id,
            session_id: entry.session_id,
            job_type: entry.job_type,
            recipient_email: entry.recipient_email,
            attempts: entry.attempts,
            error_message: entry.error_message,
            created_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(status: BatchStatus) -> NotificationBatch {
        let now = chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        NotificationBatch {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            kind: "session-notifications".to_string(),
            created_by: None,
            status,
            total: 3,
            completed: 0,
            failed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_batches_suggest_short_interval() {
        let response = StatusResponse::new(vec![
            batch(BatchStatus::InProgress),
            batch(BatchStatus::Completed),
        ]);
        assert_eq!(response.active_count, 1);
        assert_eq!(response.suggested_poll_seconds, POLL_INTERVAL_ACTIVE_SECONDS);
    }

    #[test]
    fn test_all_terminal_suggests_long_interval() {
        let response = StatusResponse::new(vec![
            batch(BatchStatus::Completed),
            batch(BatchStatus::PartialFailure),
        ]);
        assert_eq!(response.active_count, 0);
        assert_eq!(response.suggested_poll_seconds, POLL_INTERVAL_IDLE_SECONDS);
    }

    #[test]
    fn test_terminal_batches_stay_visible() {
        // Terminal batches are returned, not filtered; dropping them after
        // the grace window is the client's job.
        let response = StatusResponse::new(vec![batch(BatchStatus::Completed)]);
        assert_eq!(response.batches.len(), 1);
        assert_eq!(response.terminal_grace_seconds, TERMINAL_GRACE_SECONDS);
    }
}
