//! Read-only status queries for the polling clients.
//!
//! The job store is the source of truth; readers here are explicitly
//! non-authoritative and may observe brief staleness.

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DeadLetterEntry, NotificationBatch, NotificationJob};
use crate::repositories::{BatchRepository, DeadLetterRepository, JobRepository};

/// Exactly one filter must be set per query.
#[derive(Debug, Clone, Default)]
pub struct StatusQuery {
    pub batch_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub active: Option<bool>,
}

impl StatusQuery {
    fn filter_count(&self) -> usize {
        [
            self.batch_id.is_some(),
            self.session_id.is_some(),
            self.created_by.is_some(),
            self.active == Some(true),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

#[derive(Clone)]
pub struct StatusService {
    batch_repo: BatchRepository,
    job_repo: JobRepository,
    dead_letter_repo: DeadLetterRepository,
}

impl StatusService {
    pub fn new(
        batch_repo: BatchRepository,
        job_repo: JobRepository,
        dead_letter_repo: DeadLetterRepository,
    ) -> Self {
        Self {
            batch_repo,
            job_repo,
            dead_letter_repo,
        }
    }

    /// Batch summaries for one filter. No pagination cursor at this layer;
    /// callers apply a client-side limit.
    pub async fn query(&self, query: StatusQuery) -> AppResult<Vec<NotificationBatch>> {
        if query.filter_count() != 1 {
            return Err(AppError::Validation {
                field: "filter".to_string(),
                reason: "Exactly one of batch_id, session_id, created_by, active must be set"
                    .to_string(),
            });
        }

        if let Some(batch_id) = query.batch_id {
            return Ok(vec![self.batch_repo.find_by_id(batch_id).await?]);
        }
        if let Some(session_id) = query.session_id {
            return self.batch_repo.list_for_session(session_id).await;
        }
        if let Some(created_by) = query.created_by {
            return self.batch_repo.list_by_creator(&created_by).await;
        }
        self.batch_repo.list_active().await
    }

    /// Job-level progress for one batch, send order.
    pub async fn batch_jobs(&self, batch_id: Uuid) -> AppResult<Vec<NotificationJob>> {
        // 404 on unknown batch rather than an empty list
        self.batch_repo.find_by_id(batch_id).await?;
        self.job_repo.list_for_batch(batch_id).await
    }

    /// Dead-letter audit listing.
    pub async fn dead_letters(
        &self,
        batch_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<DeadLetterEntry>> {
        self.dead_letter_repo.list(batch_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_count_requires_exactly_one() {
        assert_eq!(StatusQuery::default().filter_count(), 0);

        let by_batch = StatusQuery {
            batch_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(by_batch.filter_count(), 1);

        let conflicting = StatusQuery {
            batch_id: Some(Uuid::new_v4()),
            session_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(conflicting.filter_count(), 2);
    }

    #[test]
    fn test_active_false_is_not_a_filter() {
        // ?active=false selects nothing specific and is rejected as no filter
        let query = StatusQuery {
            active: Some(false),
            ..Default::default()
        };
        assert_eq!(query.filter_count(), 0);
    }
}
