//! Notification job repository.
//!
//! Status changes go through a guarded SQL update: the `WHERE status IN
//! (allowed priors)` clause enforces the monotonic state machine atomically,
//! so duplicate or out-of-order callbacks can never regress a job, and
//! concurrent writers touching the same batch cannot clobber each other.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    JobChange, JobPatch, JobStatus, NewNotificationJob, NotificationJob, UpdateOutcome,
    prior_statuses,
};
use crate::schema::notification_jobs;

#[derive(Clone)]
pub struct JobRepository {
    pool: AsyncDbPool,
}

impl JobRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, job_id: Uuid) -> AppResult<NotificationJob> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_jobs::table
            .find(job_id)
            .select(NotificationJob::as_select())
            .first(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::NotFound {
                    entity: "notification_job".to_string(),
                    field: "id".to_string(),
                    value: job_id.to_string(),
                },
                _ => AppError::from(e),
            })
    }

    pub async fn list_for_batch(&self, batch_id: Uuid) -> AppResult<Vec<NotificationJob>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_jobs::table
            .filter(notification_jobs::batch_id.eq(batch_id))
            .order(notification_jobs::scheduled_for.asc())
            .select(NotificationJob::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Statuses of every job in a batch, the aggregator's input.
    pub async fn statuses_for_batch(&self, batch_id: Uuid) -> AppResult<Vec<JobStatus>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_jobs::table
            .filter(notification_jobs::batch_id.eq(batch_id))
            .select(notification_jobs::status)
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Inserts one job outside batch creation (resend path).
    pub async fn insert(&self, new_job: NewNotificationJob) -> AppResult<NotificationJob> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::insert_into(notification_jobs::table)
            .values(&new_job)
            .returning(NotificationJob::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Applies one guarded status change.
    pub async fn update_status(&self, change: &JobChange) -> AppResult<UpdateOutcome> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        Self::apply_change(&mut conn, change).await
    }

    /// Applies a list of per-job changes in one transaction.
    ///
    /// Fan-out callbacks report many jobs at once; applying them together
    /// avoids N read-modify-write rounds racing other callbacks for the same
    /// batch.
    pub async fn update_statuses_bulk(
        &self,
        changes: Vec<JobChange>,
    ) -> AppResult<Vec<(JobChange, UpdateOutcome)>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let mut outcomes = Vec::with_capacity(changes.len());
                for change in changes {
                    let outcome = Self::apply_change(conn, &change).await?;
                    outcomes.push((change, outcome));
                }
                Ok(outcomes)
            }
            .scope_boxed()
        })
        .await
    }

    async fn apply_change(
        conn: &mut AsyncPgConnection,
        change: &JobChange,
    ) -> AppResult<UpdateOutcome> {
        let priors = prior_statuses(change.status);
        let patch = JobPatch {
            status: Some(change.status),
            provider_message_id: change.provider_message_id.clone(),
            last_error: change.error.clone(),
            updated_at: Some(Utc::now().naive_utc()),
            ..Default::default()
        };

        let updated = diesel::update(
            notification_jobs::table
                .filter(notification_jobs::id.eq(change.job_id))
                .filter(notification_jobs::status.eq_any(priors)),
        )
        .set(&patch)
        .returning(NotificationJob::as_returning())
        .get_result::<NotificationJob>(conn)
        .await
        .optional()?;

        if let Some(job) = updated {
            return Ok(UpdateOutcome::Applied(Box::new(job)));
        }

        // The guard did not match: classify why without racing the winner.
        let current = notification_jobs::table
            .find(change.job_id)
            .select(notification_jobs::status)
            .first::<JobStatus>(conn)
            .await
            .optional()?;

        match current {
            None => Ok(UpdateOutcome::Missing),
            Some(status) if status == change.status => Ok(UpdateOutcome::Noop),
            Some(status) => Ok(UpdateOutcome::Rejected { current: status }),
        }
    }

    /// Resets a failed job to pending for another delivery attempt.
    ///
    /// Guarded on `status = failed`; anything else is an invalid state for
    /// retry and the job is left untouched.
    pub async fn retry(&self, job_id: Uuid) -> AppResult<NotificationJob> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        let updated = diesel::update(
            notification_jobs::table
                .filter(notification_jobs::id.eq(job_id))
                .filter(notification_jobs::status.eq(JobStatus::Failed)),
        )
        .set((
            notification_jobs::status.eq(JobStatus::Pending),
            notification_jobs::attempts.eq(notification_jobs::attempts + 1),
            notification_jobs::external_message_id.eq(None::<String>),
            notification_jobs::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(NotificationJob::as_returning())
        .get_result::<NotificationJob>(&mut conn)
        .await
        .optional()?;

        match updated {
            Some(job) => Ok(job),
            None => {
                let current = notification_jobs::table
                    .find(job_id)
                    .select(NotificationJob::as_select())
                    .first::<NotificationJob>(&mut conn)
                    .await
                    .optional()?;
                match current {
                    None => Err(AppError::NotFound {
                        entity: "notification_job".to_string(),
                        field: "id".to_string(),
                        value: job_id.to_string(),
                    }),
                    Some(job) => Err(AppError::InvalidState {
                        entity: "notification_job".to_string(),
                        id: job_id.to_string(),
                        current: job.status.to_string(),
                        requested: JobStatus::Pending.to_string(),
                    }),
                }
            }
        }
    }

    /// Records the queue message id on a published group and moves it to
    /// `scheduled`. Only `pending` rows are touched.
    pub async fn mark_scheduled(
        &self,
        job_ids: &[Uuid],
        external_message_id: &str,
    ) -> AppResult<usize> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::update(
            notification_jobs::table
                .filter(notification_jobs::id.eq_any(job_ids.to_vec()))
                .filter(notification_jobs::status.eq(JobStatus::Pending)),
        )
        .set((
            notification_jobs::status.eq(JobStatus::Scheduled),
            notification_jobs::external_message_id.eq(external_message_id.to_string()),
            notification_jobs::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    /// Pending jobs past their send time with no recorded queue message:
    /// scheduling was interrupted between persist and publish. Input to the
    /// reconciliation sweep.
    pub async fn list_unpublished_due(
        &self,
        now: NaiveDateTime,
    ) -> AppResult<Vec<NotificationJob>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_jobs::table
            .filter(notification_jobs::status.eq(JobStatus::Pending))
            .filter(notification_jobs::scheduled_for.le(now))
            .filter(notification_jobs::external_message_id.is_null())
            .order(notification_jobs::scheduled_for.asc())
            .select(NotificationJob::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
