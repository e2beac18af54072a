//! Status and type enums stored as text columns, plus the job transition rules.
//!
//! All enums use the text-backed diesel mapping so the database schema stays
//! free of custom Postgres types.

use diesel::AsExpression;
use diesel::FromSqlRow;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::io::Write;

// ============================================================================
// JobType
// ============================================================================

/// Kind of notification a job delivers, keyed off the session timeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
pub enum JobType {
    #[serde(rename = "prep-48h")]
    Prep48h,
    #[serde(rename = "prep-24h")]
    Prep24h,
    #[serde(rename = "immediate-feedback")]
    ImmediateFeedback,
    #[serde(rename = "followup-24h")]
    Followup24h,
}

impl JobType {
    /// All types considered when scheduling a session event.
    pub const ALL: [JobType; 4] = [
        JobType::Prep48h,
        JobType::Prep24h,
        JobType::ImmediateFeedback,
        JobType::Followup24h,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Prep48h => "prep-48h",
            JobType::Prep24h => "prep-24h",
            JobType::ImmediateFeedback => "immediate-feedback",
            JobType::Followup24h => "followup-24h",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl diesel::query_builder::QueryId for JobType {
    type QueryId = JobType;
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl ToSql<Text, Pg> for JobType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for JobType {
    fn from_sql(
        bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "prep-48h" => Ok(JobType::Prep48h),
            "prep-24h" => Ok(JobType::Prep24h),
            "immediate-feedback" => Ok(JobType::ImmediateFeedback),
            "followup-24h" => Ok(JobType::Followup24h),
            _ => Err(format!("Unrecognized job_type: {}", s).into()),
        }
    }
}

// ============================================================================
// JobStatus
// ============================================================================

/// Delivery status of one notification job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal statuses never transition again except via explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position in the forward progression of the state machine.
    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Scheduled => 1,
            JobStatus::InProgress => 2,
            JobStatus::Completed | JobStatus::Failed => 3,
        }
    }

    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Scheduled,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Failed,
    ];
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl diesel::query_builder::QueryId for JobStatus {
    type QueryId = JobStatus;
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl ToSql<Text, Pg> for JobStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for JobStatus {
    fn from_sql(
        bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "pending" => Ok(JobStatus::Pending),
            "scheduled" => Ok(JobStatus::Scheduled),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Unrecognized job status: {}", s).into()),
        }
    }
}

// ============================================================================
// Transition rules
// ============================================================================

/// Result of planning a status transition against the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Forward move, apply it.
    Apply,
    /// Requested status already holds; re-applying is a no-op, never an error.
    Noop,
    /// Backward or terminal-crossing move; must not be applied.
    Rejected,
}

/// Plans a job status transition.
///
/// The state machine is `pending -> scheduled -> in_progress -> {completed |
/// failed}`, monotonic with level-skipping allowed (callbacks arrive out of
/// order). Duplicate application of the current status is a no-op so that
/// at-least-once webhook delivery stays idempotent. Terminal statuses only
/// leave via the explicit retry operation, which bypasses this planner.
pub fn plan_transition(current: JobStatus, requested: JobStatus) -> TransitionOutcome {
    if current == requested {
        return TransitionOutcome::Noop;
    }
    if current.is_terminal() {
        return TransitionOutcome::Rejected;
    }
    if requested.rank() > current.rank() {
        TransitionOutcome::Apply
    } else {
        TransitionOutcome::Rejected
    }
}

/// Statuses from which a transition to `target` is a forward move.
///
/// Used to build the SQL guard (`WHERE status IN (...)`) so concurrent
/// writers can never regress a job.
pub fn prior_statuses(target: JobStatus) -> Vec<JobStatus> {
    JobStatus::ALL
        .iter()
        .copied()
        .filter(|s| plan_transition(*s, target) == TransitionOutcome::Apply)
        .collect()
}

// ============================================================================
// BatchStatus
// ============================================================================

/// Aggregate status of a batch, derived from its job set by the aggregator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    PartialFailure,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
            BatchStatus::PartialFailure => "partial_failure",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::PartialFailure | BatchStatus::Failed
        )
    }

    /// Statuses a batch holds while deliveries are still outstanding.
    pub const ACTIVE: [BatchStatus; 2] = [BatchStatus::Pending, BatchStatus::InProgress];
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl diesel::query_builder::QueryId for BatchStatus {
    type QueryId = BatchStatus;
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl ToSql<Text, Pg> for BatchStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for BatchStatus {
    fn from_sql(
        bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "pending" => Ok(BatchStatus::Pending),
            "in_progress" => Ok(BatchStatus::InProgress),
            "completed" => Ok(BatchStatus::Completed),
            "partial_failure" => Ok(BatchStatus::PartialFailure),
            "failed" => Ok(BatchStatus::Failed),
            _ => Err(format!("Unrecognized batch status: {}", s).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_serde_round_trip() {
        for job_type in JobType::ALL {
            let json = serde_json::to_string(&job_type).unwrap();
            assert_eq!(json, format!("\"{}\"", job_type.as_str()));
            let back: JobType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, job_type);
        }
    }

    #[test]
    fn test_job_status_serde_matches_as_str() {
        for status in JobStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_forward_transitions_apply() {
        assert_eq!(
            plan_transition(JobStatus::Pending, JobStatus::Scheduled),
            TransitionOutcome::Apply
        );
        assert_eq!(
            plan_transition(JobStatus::Scheduled, JobStatus::InProgress),
            TransitionOutcome::Apply
        );
        assert_eq!(
            plan_transition(JobStatus::InProgress, JobStatus::Completed),
            TransitionOutcome::Apply
        );
        assert_eq!(
            plan_transition(JobStatus::InProgress, JobStatus::Failed),
            TransitionOutcome::Apply
        );
    }

    #[test]
    fn test_level_skipping_is_allowed() {
        // Callbacks can arrive before the scheduled/in_progress bookkeeping.
        assert_eq!(
            plan_transition(JobStatus::Pending, JobStatus::Completed),
            TransitionOutcome::Apply
        );
        assert_eq!(
            plan_transition(JobStatus::Scheduled, JobStatus::Failed),
            TransitionOutcome::Apply
        );
    }

    #[test]
    fn test_duplicate_application_is_noop() {
        for status in JobStatus::ALL {
            assert_eq!(plan_transition(status, status), TransitionOutcome::Noop);
        }
    }

    #[test]
    fn test_terminal_statuses_never_regress() {
        assert_eq!(
            plan_transition(JobStatus::Completed, JobStatus::Failed),
            TransitionOutcome::Rejected
        );
        assert_eq!(
            plan_transition(JobStatus::Completed, JobStatus::Pending),
            TransitionOutcome::Rejected
        );
        assert_eq!(
            plan_transition(JobStatus::Failed, JobStatus::Completed),
            TransitionOutcome::Rejected
        );
        assert_eq!(
            plan_transition(JobStatus::Failed, JobStatus::Pending),
            TransitionOutcome::Rejected
        );
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert_eq!(
            plan_transition(JobStatus::InProgress, JobStatus::Scheduled),
            TransitionOutcome::Rejected
        );
        assert_eq!(
            plan_transition(JobStatus::Scheduled, JobStatus::Pending),
            TransitionOutcome::Rejected
        );
    }

    #[test]
    fn test_prior_statuses_for_completed() {
        let priors = prior_statuses(JobStatus::Completed);
        assert_eq!(
            priors,
            vec![JobStatus::Pending, JobStatus::Scheduled, JobStatus::InProgress]
        );
    }

    #[test]
    fn test_prior_statuses_never_include_terminal() {
        for target in JobStatus::ALL {
            for prior in prior_statuses(target) {
                assert!(!prior.is_terminal());
            }
        }
    }
}
