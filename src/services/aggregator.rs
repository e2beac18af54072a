//! Batch progress aggregation.
//!
//! The aggregator is the only writer of batch status and counts. It is
//! invoked after every job mutation and doubles as the maintenance repair
//! operation over all active batches.

use futures::future::join_all;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{BatchRollup, NotificationBatch};
use crate::repositories::{BatchRepository, JobRepository};

#[derive(Clone)]
pub struct AggregatorService {
    job_repo: JobRepository,
    batch_repo: BatchRepository,
}

impl AggregatorService {
    pub fn new(job_repo: JobRepository, batch_repo: BatchRepository) -> Self {
        Self {
            job_repo,
            batch_repo,
        }
    }

    /// Recomputes one batch's roll-up from its job set and writes it back.
    pub async fn recompute(&self, batch_id: Uuid) -> AppResult<NotificationBatch> {
        let statuses = self.job_repo.statuses_for_batch(batch_id).await?;
        let rollup = BatchRollup::derive(&statuses);
        let batch = self.batch_repo.apply_rollup(batch_id, &rollup).await?;

        tracing::debug!(
            batch_id = %batch_id,
            status = %batch.status,
            completed = batch.completed,
            failed = batch.failed,
            total = batch.total,
            "Batch roll-up recomputed"
        );

        Ok(batch)
    }

    /// Recomputes every active batch; repairs aggregate drift after logic
    /// changes or interrupted runs. Returns how many batches were touched.
    pub async fn recalculate_active(&self) -> AppResult<usize> {
        let active = self.batch_repo.list_active().await?;
        let count = active.len();

        let results = join_all(active.iter().map(|batch| self.recompute(batch.id))).await;
        for (batch, result) in active.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(batch_id = %batch.id, error = %e, "Recalculation failed");
            }
        }

        tracing::info!(batches = count, "Active batch recalculation finished");
        Ok(count)
    }
}
