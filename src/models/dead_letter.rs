//! Dead-letter models: append-only snapshots of failed deliveries.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::enums::JobType;
use crate::models::job::NotificationJob;

/// DeadLetterEntry query model for SELECT operations
#[derive(Debug, Clone, Queryable, Selectable, Serialize, utoipa::ToSchema)]
#[diesel(table_name = crate::schema::dead_letter_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeadLetterEntry {
    pub id: i64,
    pub job_id: Uuid,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub attempts: i32,
    pub error_message: String,
    /// Full job row at the moment of failure, for audit and replay.
    pub job_snapshot: JsonValue,
    pub created_at: NaiveDateTime,
}

/// NewDeadLetterEntry insert model for INSERT operations
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::dead_letter_entries)]
pub struct NewDeadLetterEntry {
    pub job_id: Uuid,
    pub batch_id: Uuid,
    pub session_id: Uuid,
    pub job_type: JobType,
    pub recipient_email: String,
    pub attempts: i32,
    pub error_message: String,
    pub job_snapshot: JsonValue,
}

impl NewDeadLetterEntry {
    /// Snapshots a failed job together with its error message.
    pub fn from_job(job: &NotificationJob, error: &str) -> Self {
        Self {
            job_id: job.id,
            batch_id: job.batch_id,
            session_id: job.session_id,
            job_type: job.job_type,
            recipient_email: job.recipient_email.clone(),
            attempts: job.attempts,
            error_message: error.to_string(),
            job_snapshot: serde_json::to_value(job).unwrap_or(JsonValue::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::JobStatus;

    fn failed_job() -> NotificationJob {
        NotificationJob {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            job_type: JobType::Prep24h,
            recipient_email: "mentee@example.com".to_string(),
            recipient_name: "Mentee".to_string(),
            scheduled_for: chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            status: JobStatus::Failed,
            attempts: 3,
            external_message_id: Some("msg_123".to_string()),
            provider_message_id: None,
            last_error: Some("mailbox unavailable".to_string()),
            created_at: chrono::NaiveDate::from_ymd_opt(2026, 2, 27)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            updated_at: chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(9, 5, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_snapshot_carries_job_identity() {
        let job = failed_job();
        let entry = NewDeadLetterEntry::from_job(&job, "mailbox unavailable");

        assert_eq!(entry.job_id, job.id);
        assert_eq!(entry.batch_id, job.batch_id);
        assert_eq!(entry.session_id, job.session_id);
        assert_eq!(entry.attempts, 3);
        assert_eq!(entry.error_message, "mailbox unavailable");
    }

    #[test]
    fn test_snapshot_preserves_full_row() {
        let job = failed_job();
        let entry = NewDeadLetterEntry::from_job(&job, "mailbox unavailable");

        let snapshot = entry.job_snapshot.as_object().expect("object snapshot");
        assert_eq!(
            snapshot.get("recipient_email").and_then(|v| v.as_str()),
            Some("mentee@example.com")
        );
        assert_eq!(
            snapshot.get("status").and_then(|v| v.as_str()),
            Some("failed")
        );
    }
}
