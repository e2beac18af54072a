//! Notification batch repository.
//!
//! Batches are created atomically with their job set; the status and counts
//! columns are written back only through `apply_rollup`, keeping the
//! aggregator the single owner of the roll-up.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    BatchRollup, BatchStatus, NewNotificationBatch, NewNotificationJob, NotificationBatch,
    NotificationJob,
};
use crate::schema::{notification_batches, notification_jobs};

#[derive(Clone)]
pub struct BatchRepository {
    pool: AsyncDbPool,
}

impl BatchRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Persists a batch together with its full job set in one transaction.
    pub async fn create_with_jobs(
        &self,
        new_batch: NewNotificationBatch,
        new_jobs: Vec<NewNotificationJob>,
    ) -> AppResult<(NotificationBatch, Vec<NotificationJob>)> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let batch = diesel::insert_into(notification_batches::table)
                    .values(&new_batch)
                    .returning(NotificationBatch::as_returning())
                    .get_result::<NotificationBatch>(conn)
                    .await?;

                let jobs = diesel::insert_into(notification_jobs::table)
                    .values(&new_jobs)
                    .returning(NotificationJob::as_returning())
                    .get_results::<NotificationJob>(conn)
                    .await?;

                Ok((batch, jobs))
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn find_by_id(&self, batch_id: Uuid) -> AppResult<NotificationBatch> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_batches::table
            .find(batch_id)
            .select(NotificationBatch::as_select())
            .first(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::NotFound {
                    entity: "notification_batch".to_string(),
                    field: "id".to_string(),
                    value: batch_id.to_string(),
                },
                _ => AppError::from(e),
            })
    }

    pub async fn list_for_session(&self, session_id: Uuid) -> AppResult<Vec<NotificationBatch>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_batches::table
            .filter(notification_batches::session_id.eq(session_id))
            .order(notification_batches::created_at.desc())
            .select(NotificationBatch::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Active (non-terminal) batches for one session; the force-reschedule
    /// duplicate check.
    pub async fn list_active_for_session(
        &self,
        session_id: Uuid,
    ) -> AppResult<Vec<NotificationBatch>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_batches::table
            .filter(notification_batches::session_id.eq(session_id))
            .filter(notification_batches::status.eq_any(BatchStatus::ACTIVE.to_vec()))
            .order(notification_batches::created_at.desc())
            .select(NotificationBatch::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_active(&self) -> AppResult<Vec<NotificationBatch>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_batches::table
            .filter(notification_batches::status.eq_any(BatchStatus::ACTIVE.to_vec()))
            .order(notification_batches::created_at.desc())
            .select(NotificationBatch::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_by_creator(&self, created_by: &str) -> AppResult<Vec<NotificationBatch>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        notification_batches::table
            .filter(notification_batches::created_by.eq(created_by.to_string()))
            .order(notification_batches::created_at.desc())
            .select(NotificationBatch::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Writes the aggregator's roll-up back onto the batch row.
    pub async fn apply_rollup(
        &self,
        batch_id: Uuid,
        rollup: &BatchRollup,
    ) -> AppResult<NotificationBatch> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::update(notification_batches::table.find(batch_id))
            .set((
                notification_batches::status.eq(rollup.status),
                notification_batches::total.eq(rollup.total),
                notification_batches::completed.eq(rollup.completed),
                notification_batches::failed.eq(rollup.failed),
                notification_batches::updated_at.eq(Utc::now().naive_utc()),
            ))
            .returning(NotificationBatch::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::NotFound {
                    entity: "notification_batch".to_string(),
                    field: "id".to_string(),
                    value: batch_id.to_string(),
                },
                _ => AppError::from(e),
            })
    }

    /// Removes a batch and all its jobs; used by forced reschedule. The old
    /// batch id stops being queryable.
    pub async fn delete(&self, batch_id: Uuid) -> AppResult<usize> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let jobs_removed = diesel::delete(
                    notification_jobs::table
                        .filter(notification_jobs::batch_id.eq(batch_id)),
                )
                .execute(conn)
                .await?;

                let batches_removed =
                    diesel::delete(notification_batches::table.find(batch_id))
                        .execute(conn)
                        .await?;

                if batches_removed == 0 {
                    return Err(AppError::NotFound {
                        entity: "notification_batch".to_string(),
                        field: "id".to_string(),
                        value: batch_id.to_string(),
                    });
                }

                Ok(jobs_removed + batches_removed)
            }
            .scope_boxed()
        })
        .await
    }
}
