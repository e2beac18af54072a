//! Scheduling: turning a session event into a batch of delayed deliveries.
//!
//! For each notification type a target send time is a pure function of the
//! session's start and duration. Jobs are grouped by (type, target time) so
//! one queue message fans out to every recipient due at that moment, keeping
//! the number of outbound messages bounded by the type count rather than the
//! recipient count.

use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    JobStatus, JobType, NewNotificationBatch, NewNotificationJob, NotificationJob,
    ParticipantRole, SESSION_BATCH_KIND, SessionEvent,
};
use crate::queue::{DeliveryPublisher, EnvelopeJob, OutboundPayload, PublishRequest, SingleDelivery};
use crate::repositories::{BatchRepository, JobRepository};
use crate::services::aggregator::AggregatorService;

/// Returned to the caller after a successful scheduling run.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ScheduleReceipt {
    pub batch_id: Uuid,
    pub job_count: usize,
}

/// Per-event outcome inside a bulk scheduling run.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EventOutcome {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ScheduleReceipt>,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a bulk scheduling run over many events.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BulkScheduleReport {
    pub scheduled: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<EventOutcome>,
}

#[derive(Clone)]
pub struct SchedulerService {
    job_repo: JobRepository,
    batch_repo: BatchRepository,
    aggregator: AggregatorService,
    publisher: Arc<dyn DeliveryPublisher>,
}

impl SchedulerService {
    pub fn new(
        job_repo: JobRepository,
        batch_repo: BatchRepository,
        aggregator: AggregatorService,
        publisher: Arc<dyn DeliveryPublisher>,
    ) -> Self {
        Self {
            job_repo,
            batch_repo,
            aggregator,
            publisher,
        }
    }

    /// Schedules every eligible notification for one session event.
    ///
    /// Returns `None` when there is nothing to schedule: the event is
    /// already past, or no recipient matches any remaining type. Callers
    /// must treat `None` as a normal skip.
    ///
    /// When active batches already exist for the session, `force` deletes
    /// them (batch and jobs) before the new batch is created; without
    /// `force` the call fails with a Duplicate error.
    pub async fn schedule_session(
        &self,
        event: &SessionEvent,
        created_by: Option<String>,
        force: bool,
    ) -> AppResult<Option<ScheduleReceipt>> {
        let now = Utc::now().naive_utc();
        let planned = plan_jobs(event, now);
        if planned.is_empty() {
            tracing::info!(
                session_id = %event.session_id,
                starts_at = %event.starts_at,
                "Nothing eligible to schedule"
            );
            return Ok(None);
        }

        let existing = self
            .batch_repo
            .list_active_for_session(event.session_id)
            .await?;
        if !existing.is_empty() {
            if !force {
                return Err(AppError::Duplicate {
                    entity: "notification_batch".to_string(),
                    field: "session_id".to_string(),
                    value: event.session_id.to_string(),
                });
            }
            for batch in &existing {
                let removed = self.batch_repo.delete(batch.id).await?;
                tracing::warn!(
                    batch_id = %batch.id,
                    session_id = %event.session_id,
                    rows_removed = removed,
                    "Deleted active batch for forced reschedule"
                );
            }
        }

        let batch_id = Uuid::new_v4();
        let new_batch = NewNotificationBatch {
            id: batch_id,
            session_id: event.session_id,
            kind: SESSION_BATCH_KIND.to_string(),
            created_by,
            status: crate::models::BatchStatus::Pending,
            total: planned.len() as i32,
            completed: 0,
            failed: 0,
        };
        let new_jobs: Vec<NewNotificationJob> = planned
            .iter()
            .map(|p| NewNotificationJob {
                id: Uuid::new_v4(),
                batch_id,
                session_id: event.session_id,
                job_type: p.job_type,
                recipient_email: p.email.clone(),
                recipient_name: p.name.clone(),
                scheduled_for: p.scheduled_for,
                status: JobStatus::Pending,
                attempts: 0,
            })
            .collect();

        let (batch, jobs) = self.batch_repo.create_with_jobs(new_batch, new_jobs).await?;

        // One publish per (type, target time) group. A failed publish leaves
        // its group pending; the reconciliation sweep re-publishes later.
        for group in group_jobs(&jobs) {
            let envelope = OutboundPayload::batch(
                batch.id,
                event.session_id,
                group.jobs.iter().map(|j| EnvelopeJob::from_job(j)).collect(),
            );
            let request = PublishRequest {
                body: envelope.to_value()?,
                delay_seconds: delay_seconds(group.scheduled_for, now),
                batch_id: Some(batch.id),
                session_id: event.session_id,
            };

            match self.publisher.publish(request).await {
                Ok(receipt) => {
                    let ids: Vec<Uuid> = group.jobs.iter().map(|j| j.id).collect();
                    self.job_repo
                        .mark_scheduled(&ids, &receipt.message_id)
                        .await?;
                    tracing::info!(
                        batch_id = %batch.id,
                        job_type = %group.job_type,
                        jobs = ids.len(),
                        message_id = %receipt.message_id,
                        "Delivery group published"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        batch_id = %batch.id,
                        job_type = %group.job_type,
                        error = %e,
                        "Publish failed; group left pending for reconciliation"
                    );
                }
            }
        }

        self.aggregator.recompute(batch.id).await?;

        Ok(Some(ScheduleReceipt {
            batch_id: batch.id,
            job_count: jobs.len(),
        }))
    }

    /// Schedules many events, isolating per-event failures: one event's
    /// error is reported without aborting the rest.
    pub async fn schedule_many(
        &self,
        events: Vec<SessionEvent>,
        created_by: Option<String>,
        force: bool,
    ) -> BulkScheduleReport {
        let mut outcomes = Vec::with_capacity(events.len());
        let (mut scheduled, mut skipped, mut failed) = (0usize, 0usize, 0usize);

        for event in events {
            let session_id = event.session_id;
            match self
                .schedule_session(&event, created_by.clone(), force)
                .await
            {
                Ok(Some(receipt)) => {
                    scheduled += 1;
                    outcomes.push(EventOutcome {
                        session_id,
                        receipt: Some(receipt),
                        skipped: false,
                        error: None,
                    });
                }
                Ok(None) => {
                    skipped += 1;
                    outcomes.push(EventOutcome {
                        session_id,
                        receipt: None,
                        skipped: true,
                        error: None,
                    });
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(session_id = %session_id, error = %e, "Event scheduling failed");
                    outcomes.push(EventOutcome {
                        session_id,
                        receipt: None,
                        skipped: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        BulkScheduleReport {
            scheduled,
            skipped,
            failed,
            outcomes,
        }
    }

    /// Publishes one pending job as its own delayed message (manual retry,
    /// resend and the reconciliation sweep).
    pub async fn schedule_single_job(&self, job: &NotificationJob) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        let payload = OutboundPayload::Single(SingleDelivery::from_job(job));
        let request = PublishRequest {
            body: payload.to_value()?,
            delay_seconds: delay_seconds(job.scheduled_for, now),
            batch_id: Some(job.batch_id),
            session_id: job.session_id,
        };

        let receipt = self.publisher.publish(request).await?;
        self.job_repo
            .mark_scheduled(&[job.id], &receipt.message_id)
            .await?;
        self.aggregator.recompute(job.batch_id).await?;

        tracing::info!(
            job_id = %job.id,
            batch_id = %job.batch_id,
            message_id = %receipt.message_id,
            "Single job published"
        );
        Ok(())
    }

    /// Resets a failed job and publishes another delivery attempt.
    pub async fn retry_job(&self, job_id: Uuid) -> AppResult<NotificationJob> {
        let job = self.job_repo.retry(job_id).await?;
        self.schedule_single_job(&job).await?;
        self.job_repo.find_by_id(job_id).await
    }

    /// Creates a fresh job for a completed delivery and publishes it.
    ///
    /// Completed jobs are never transitioned; the resend gets a new job id
    /// in the same batch.
    pub async fn resend_job(&self, job_id: Uuid) -> AppResult<NotificationJob> {
        let original = self.job_repo.find_by_id(job_id).await?;
        if original.status != JobStatus::Completed {
            return Err(AppError::InvalidState {
                entity: "notification_job".to_string(),
                id: job_id.to_string(),
                current: original.status.to_string(),
                requested: "resend".to_string(),
            });
        }

        let new_job = self
            .job_repo
            .insert(NewNotificationJob {
                id: Uuid::new_v4(),
                batch_id: original.batch_id,
                session_id: original.session_id,
                job_type: original.job_type,
                recipient_email: original.recipient_email.clone(),
                recipient_name: original.recipient_name.clone(),
                scheduled_for: Utc::now().naive_utc(),
                status: JobStatus::Pending,
                attempts: 0,
            })
            .await?;

        self.schedule_single_job(&new_job).await?;
        self.job_repo.find_by_id(new_job.id).await
    }

    /// Re-publishes pending jobs whose send time passed without a recorded
    /// queue message, repairing runs interrupted between persist and
    /// publish. Returns (examined, republished).
    pub async fn reconcile_unpublished(&self) -> AppResult<(usize, usize)> {
        let now = Utc::now().naive_utc();
        let orphans = self.job_repo.list_unpublished_due(now).await?;
        let examined = orphans.len();
        let mut republished = 0usize;

        for job in &orphans {
            match self.schedule_single_job(job).await {
                Ok(()) => republished += 1,
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Reconcile publish failed");
                }
            }
        }

        if examined > 0 {
            tracing::info!(examined, republished, "Reconciliation sweep finished");
        }
        Ok((examined, republished))
    }

    /// Cancels an already-published delayed message before it fires. Job
    /// state is deliberately left untouched.
    pub async fn cancel_message(&self, message_id: &str) -> AppResult<()> {
        self.publisher.cancel(message_id).await
    }
}

// ============================================================================
// Pure scheduling logic
// ============================================================================

#[derive(Debug, Clone)]
struct PlannedJob {
    job_type: JobType,
    scheduled_for: NaiveDateTime,
    email: String,
    name: String,
}

struct DeliveryGroup<'a> {
    job_type: JobType,
    scheduled_for: NaiveDateTime,
    jobs: Vec<&'a NotificationJob>,
}

/// Target send time for one notification type, relative to the session.
fn target_send_time(
    job_type: JobType,
    starts_at: NaiveDateTime,
    duration_minutes: i64,
) -> NaiveDateTime {
    let ends_at = starts_at + Duration::minutes(duration_minutes);
    match job_type {
        JobType::Prep48h => starts_at - Duration::hours(48),
        JobType::Prep24h => starts_at - Duration::hours(24),
        JobType::ImmediateFeedback => ends_at,
        JobType::Followup24h => ends_at + Duration::hours(24),
    }
}

/// Whether a notification type goes to a recipient with this role. Prep
/// reminders fan out to everyone; feedback prompts only to mentees.
fn applies_to(job_type: JobType, role: ParticipantRole) -> bool {
    match job_type {
        JobType::Prep48h | JobType::Prep24h => true,
        JobType::ImmediateFeedback | JobType::Followup24h => role == ParticipantRole::Mentee,
    }
}

/// Expands an event into per-recipient planned jobs, skipping every type
/// whose target time has already passed.
fn plan_jobs(event: &SessionEvent, now: NaiveDateTime) -> Vec<PlannedJob> {
    let mut planned = Vec::new();
    for job_type in JobType::ALL {
        let target = target_send_time(job_type, event.starts_at, event.duration_minutes);
        if target <= now {
            continue;
        }
        for recipient in &event.recipients {
            if !applies_to(job_type, recipient.role) {
                continue;
            }
            planned.push(PlannedJob {
                job_type,
                scheduled_for: target,
                email: recipient.email.clone(),
                name: recipient.name.clone(),
            });
        }
    }
    planned
}

/// Groups persisted jobs by (type, target time); one queue message per
/// group, ordered by send time for deterministic publishing.
fn group_jobs(jobs: &[NotificationJob]) -> Vec<DeliveryGroup<'_>> {
    let mut groups: BTreeMap<(NaiveDateTime, JobType), Vec<&NotificationJob>> = BTreeMap::new();
    for job in jobs {
        groups
            .entry((job.scheduled_for, job.job_type))
            .or_default()
            .push(job);
    }
    groups
        .into_iter()
        .map(|((scheduled_for, job_type), jobs)| DeliveryGroup {
            job_type,
            scheduled_for,
            jobs,
        })
        .collect()
}

/// Seconds until the target time, clamped at zero for past targets.
fn delay_seconds(target: NaiveDateTime, now: NaiveDateTime) -> u64 {
    (target - now).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionRecipient;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn event(starts_at: NaiveDateTime) -> SessionEvent {
        SessionEvent {
            session_id: Uuid::new_v4(),
            starts_at,
            duration_minutes: 60,
            recipients: vec![
                SessionRecipient {
                    email: "mentor@example.com".to_string(),
                    name: "Mentor".to_string(),
                    role: ParticipantRole::Mentor,
                },
                SessionRecipient {
                    email: "mentee@example.com".to_string(),
                    name: "Mentee".to_string(),
                    role: ParticipantRole::Mentee,
                },
            ],
        }
    }

    #[test]
    fn test_target_send_times() {
        let starts_at = ts(2026, 3, 10, 15);
        assert_eq!(
            target_send_time(JobType::Prep48h, starts_at, 60),
            ts(2026, 3, 8, 15)
        );
        assert_eq!(
            target_send_time(JobType::Prep24h, starts_at, 60),
            ts(2026, 3, 9, 15)
        );
        assert_eq!(
            target_send_time(JobType::ImmediateFeedback, starts_at, 60),
            ts(2026, 3, 10, 16)
        );
        assert_eq!(
            target_send_time(JobType::Followup24h, starts_at, 60),
            ts(2026, 3, 11, 16)
        );
    }

    #[test]
    fn test_plan_covers_all_types_for_future_event() {
        let starts_at = ts(2026, 3, 10, 15);
        let now = ts(2026, 3, 1, 0);
        let planned = plan_jobs(&event(starts_at), now);

        // prep types to both recipients, feedback types to the mentee only
        assert_eq!(planned.len(), 2 + 2 + 1 + 1);
    }

    #[test]
    fn test_plan_skips_types_already_past() {
        let starts_at = ts(2026, 3, 10, 15);
        // 36h before start: prep-48h is already past
        let now = ts(2026, 3, 9, 3);
        let planned = plan_jobs(&event(starts_at), now);

        assert!(planned.iter().all(|p| p.job_type != JobType::Prep48h));
        assert!(planned.iter().any(|p| p.job_type == JobType::Prep24h));
    }

    #[test]
    fn test_plan_empty_for_fully_past_event() {
        let starts_at = ts(2026, 3, 10, 15);
        // two days after the followup window
        let now = ts(2026, 3, 14, 0);
        assert!(plan_jobs(&event(starts_at), now).is_empty());
    }

    #[test]
    fn test_plan_empty_without_recipients() {
        let mut e = event(ts(2026, 3, 10, 15));
        e.recipients.clear();
        assert!(plan_jobs(&e, ts(2026, 3, 1, 0)).is_empty());
    }

    #[test]
    fn test_feedback_types_exclude_mentors() {
        assert!(applies_to(JobType::Prep48h, ParticipantRole::Mentor));
        assert!(applies_to(JobType::Prep24h, ParticipantRole::Mentee));
        assert!(!applies_to(JobType::ImmediateFeedback, ParticipantRole::Mentor));
        assert!(applies_to(JobType::ImmediateFeedback, ParticipantRole::Mentee));
        assert!(!applies_to(JobType::Followup24h, ParticipantRole::Mentor));
    }

    #[test]
    fn test_delay_clamps_at_zero() {
        let now = ts(2026, 3, 10, 12);
        assert_eq!(delay_seconds(ts(2026, 3, 10, 13), now), 3600);
        assert_eq!(delay_seconds(ts(2026, 3, 10, 11), now), 0);
    }

    #[test]
    fn test_grouping_bounds_outbound_messages() {
        let batch_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let target = ts(2026, 3, 8, 15);
        let make_job = |email: &str, job_type: JobType, at: NaiveDateTime| NotificationJob {
            id: Uuid::new_v4(),
            batch_id,
            session_id,
            job_type,
            recipient_email: email.to_string(),
            recipient_name: email.to_string(),
            scheduled_for: at,
            status: JobStatus::Pending,
            attempts: 0,
            external_message_id: None,
            provider_message_id: None,
            last_error: None,
            created_at: target,
            updated_at: target,
        };

        let jobs = vec![
            make_job("a@example.com", JobType::Prep48h, target),
            make_job("b@example.com", JobType::Prep48h, target),
            make_job("a@example.com", JobType::Prep24h, ts(2026, 3, 9, 15)),
        ];

        let groups = group_jobs(&jobs);
        assert_eq!(groups.len(), 2);
        // ordered by send time
        assert_eq!(groups[0].job_type, JobType::Prep48h);
        assert_eq!(groups[0].jobs.len(), 2);
        assert_eq!(groups[1].job_type, JobType::Prep24h);
        assert_eq!(groups[1].jobs.len(), 1);
    }
}
