//! Notification batch models and the aggregate roll-up derivation.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::models::enums::{BatchStatus, JobStatus};

/// Batch kind recorded for scheduler-created session fan-outs.
pub const SESSION_BATCH_KIND: &str = "session-notifications";

/// NotificationBatch query model for SELECT operations
#[derive(Debug, Clone, Queryable, Selectable, Serialize, utoipa::ToSchema)]
#[diesel(table_name = crate::schema::notification_batches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationBatch {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: String,
    pub created_by: Option<String>,
    pub status: BatchStatus,
    pub total: i32,
    pub completed: i32,
    pub failed: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// NewNotificationBatch insert model for INSERT operations
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::notification_batches)]
pub struct NewNotificationBatch {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: String,
    pub created_by: Option<String>,
    pub status: BatchStatus,
    pub total: i32,
    pub completed: i32,
    pub failed: i32,
}

/// Aggregate view over a batch's job set, written back by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRollup {
    pub total: i32,
    pub completed: i32,
    pub failed: i32,
    pub status: BatchStatus,
}

impl BatchRollup {
    /// Derives the roll-up from the statuses of every job in the batch.
    ///
    /// - `completed` iff every job completed
    /// - `failed` iff every job failed
    /// - `partial_failure` iff every job is terminal with both outcomes present
    /// - `in_progress` if any job has left `pending`
    /// - `pending` otherwise
    pub fn derive(statuses: &[JobStatus]) -> Self {
        let total = statuses.len() as i32;
        let completed = statuses.iter().filter(|s| **s == JobStatus::Completed).count() as i32;
        let failed = statuses.iter().filter(|s| **s == JobStatus::Failed).count() as i32;

        let status = if total == 0 {
            BatchStatus::Pending
        } else if completed == total {
            BatchStatus::Completed
        } else if failed == total {
            BatchStatus::Failed
        } else if completed + failed == total {
            BatchStatus::PartialFailure
        } else if statuses.iter().any(|s| *s != JobStatus::Pending) {
            BatchStatus::InProgress
        } else {
            BatchStatus::Pending
        };

        Self {
            total,
            completed,
            failed,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_all_completed_rolls_up_completed() {
        let rollup = BatchRollup::derive(&[JobStatus::Completed; 3]);
        assert_eq!(rollup.status, BatchStatus::Completed);
        assert_eq!(rollup.completed, 3);
        assert_eq!(rollup.failed, 0);
        assert_eq!(rollup.total, 3);
    }

    #[test]
    fn test_all_failed_rolls_up_failed() {
        let rollup = BatchRollup::derive(&[JobStatus::Failed; 2]);
        assert_eq!(rollup.status, BatchStatus::Failed);
        assert_eq!(rollup.failed, 2);
    }

    #[test]
    fn test_mixed_terminal_rolls_up_partial_failure() {
        let rollup = BatchRollup::derive(&[
            JobStatus::Completed,
            JobStatus::Completed,
            JobStatus::Failed,
        ]);
        assert_eq!(rollup.status, BatchStatus::PartialFailure);
        assert_eq!(rollup.completed, 2);
        assert_eq!(rollup.failed, 1);
    }

    #[test]
    fn test_any_progress_rolls_up_in_progress() {
        let rollup = BatchRollup::derive(&[JobStatus::Pending, JobStatus::Scheduled]);
        assert_eq!(rollup.status, BatchStatus::InProgress);

        let rollup = BatchRollup::derive(&[JobStatus::Pending, JobStatus::Completed]);
        assert_eq!(rollup.status, BatchStatus::InProgress);
    }

    #[test]
    fn test_all_pending_rolls_up_pending() {
        let rollup = BatchRollup::derive(&[JobStatus::Pending; 4]);
        assert_eq!(rollup.status, BatchStatus::Pending);
    }

    #[test]
    fn test_empty_batch_rolls_up_pending() {
        let rollup = BatchRollup::derive(&[]);
        assert_eq!(rollup.status, BatchStatus::Pending);
        assert_eq!(rollup.total, 0);
    }

    fn status_strategy() -> impl Strategy<Value = JobStatus> {
        prop::sample::select(JobStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_counts_never_exceed_total(statuses in prop::collection::vec(status_strategy(), 0..64)) {
            let rollup = BatchRollup::derive(&statuses);
            prop_assert!(rollup.completed + rollup.failed <= rollup.total);
            prop_assert_eq!(rollup.total as usize, statuses.len());
        }

        #[test]
        fn prop_completed_iff_every_job_completed(statuses in prop::collection::vec(status_strategy(), 1..64)) {
            let rollup = BatchRollup::derive(&statuses);
            let all_completed = statuses.iter().all(|s| *s == JobStatus::Completed);
            prop_assert_eq!(rollup.status == BatchStatus::Completed, all_completed);
        }

        #[test]
        fn prop_terminal_batch_iff_all_jobs_terminal(statuses in prop::collection::vec(status_strategy(), 1..64)) {
            let rollup = BatchRollup::derive(&statuses);
            let all_terminal = statuses.iter().all(|s| s.is_terminal());
            prop_assert_eq!(rollup.status.is_terminal(), all_terminal);
        }
    }
}
