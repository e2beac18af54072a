//! Dead-letter repository: append-only failure audit.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{DeadLetterEntry, NewDeadLetterEntry, NotificationJob};
use crate::schema::dead_letter_entries;

#[derive(Clone)]
pub struct DeadLetterRepository {
    pool: AsyncDbPool,
}

impl DeadLetterRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Appends a snapshot of a failed job. Entries are never updated or
    /// deleted by normal operation.
    pub async fn append(&self, job: &NotificationJob, error: &str) -> AppResult<DeadLetterEntry> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        diesel::insert_into(dead_letter_entries::table)
            .values(&NewDeadLetterEntry::from_job(job, error))
            .returning(DeadLetterEntry::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Audit listing, newest first, optionally narrowed to one batch.
    pub async fn list(
        &self,
        batch_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<DeadLetterEntry>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        let mut query = dead_letter_entries::table
            .select(DeadLetterEntry::as_select())
            .into_boxed();
        if let Some(batch_id) = batch_id {
            query = query.filter(dead_letter_entries::batch_id.eq(batch_id));
        }

        query
            .order(dead_letter_entries::created_at.desc())
            .limit(limit)
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Number of entries recorded for one job.
    pub async fn count_for_job(&self, job_id: Uuid) -> AppResult<i64> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })?;

        dead_letter_entries::table
            .filter(dead_letter_entries::job_id.eq(job_id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
