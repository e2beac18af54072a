//! Notification job models for database operations.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::models::enums::{JobStatus, JobType};

/// NotificationJob query model for SELECT operations
#[derive(Debug, Clone, Queryable, Selectable, Serialize, utoipa::ToSchema)]
#[diesel(table_name = crate::schema::notification_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationJob {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub recipient_name: String,
    pub scheduled_for: NaiveDateTime,
    pub status: JobStatus,
    pub attempts: i32,
    /// Message id handed back by the delayed-message queue on publish.
    pub external_message_id: Option<String>,
    /// Message id handed back by the email provider on delivery.
    pub provider_message_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// NewNotificationJob insert model for INSERT operations
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::notification_jobs)]
pub struct NewNotificationJob {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub recipient_name: String,
    pub scheduled_for: NaiveDateTime,
    pub status: JobStatus,
    pub attempts: i32,
}

/// Partial update model; `None` fields are left untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = crate::schema::notification_jobs)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub external_message_id: Option<String>,
    pub provider_message_id: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

/// One requested per-job status change, as classified from a callback.
#[derive(Debug, Clone)]
pub struct JobChange {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

impl JobChange {
    pub fn completed(job_id: Uuid, provider_message_id: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Completed,
            provider_message_id: Some(provider_message_id),
            error: None,
        }
    }

    pub fn failed(job_id: Uuid, error: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Failed,
            provider_message_id: None,
            error: Some(error),
        }
    }
}

/// Result of applying one guarded status change.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The transition was a forward move and has been written.
    Applied(Box<NotificationJob>),
    /// The job already held the requested status; nothing changed.
    Noop,
    /// Backward or terminal-crossing move; nothing changed.
    Rejected { current: JobStatus },
    /// No job with that id.
    Missing,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }
}
