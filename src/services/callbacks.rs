//! Callback bookkeeping: the success and exhausted-retries paths.
//!
//! Both paths decode the original envelope out of the callback body to
//! recover job identities, classify per-job outcomes, and apply one bulk
//! guarded update. Newly failed jobs are dead-lettered exactly once: a
//! duplicate failure callback hits the terminal guard and never appends a
//! second entry.

use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{JobChange, JobStatus, UpdateOutcome};
use crate::queue::{QueueCallback, WorkerReport, extract_error_message};
use crate::queue::envelope::OutboundPayload;
use crate::repositories::{DeadLetterRepository, JobRepository};
use crate::services::aggregator::AggregatorService;

/// Counters describing what one callback ended up doing.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallbackReport {
    pub applied: usize,
    pub noop: usize,
    pub rejected: usize,
    pub missing: usize,
    pub dead_lettered: usize,
}

#[derive(Clone)]
pub struct CallbackService {
    job_repo: JobRepository,
    dead_letter_repo: DeadLetterRepository,
    aggregator: AggregatorService,
}

impl CallbackService {
    pub fn new(
        job_repo: JobRepository,
        dead_letter_repo: DeadLetterRepository,
        aggregator: AggregatorService,
    ) -> Self {
        Self {
            job_repo,
            dead_letter_repo,
            aggregator,
        }
    }

    /// Success path: the worker answered. Each worker-reported result is
    /// classified as success (provider message id) or failure (error), and
    /// the whole set is applied as one bulk update.
    pub async fn handle_success(&self, callback: QueueCallback) -> AppResult<CallbackReport> {
        let payload = callback.decode_source()?;
        let report = callback.decode_worker_report()?;

        let changes = match &payload {
            OutboundPayload::Batch(envelope) => {
                let Some(report) = report else {
                    tracing::warn!(
                        batch_id = %envelope.batch_id,
                        "Success callback carried no worker body; nothing to record"
                    );
                    return Ok(CallbackReport::default());
                };
                Self::classify_batch_results(&report)
            }
            OutboundPayload::Single(single) => {
                Self::classify_single_result(single.job_id, report.as_ref())
            }
        };

        if changes.is_empty() {
            tracing::warn!(
                batch_id = %payload.batch_id(),
                "Success callback produced no per-job results"
            );
            return Ok(CallbackReport::default());
        }

        self.apply_changes(payload.batch_id(), changes).await
    }

    /// Exhausted-retries path: every job the message covered is failed with
    /// one extracted error message and dead-lettered.
    pub async fn handle_failure(&self, callback: QueueCallback) -> AppResult<CallbackReport> {
        let payload = callback.decode_source()?;
        let message = Self::failure_message(&callback)?;

        let changes: Vec<JobChange> = payload
            .job_ids()
            .into_iter()
            .map(|job_id| JobChange::failed(job_id, message.clone()))
            .collect();

        tracing::warn!(
            batch_id = %payload.batch_id(),
            session_id = %payload.session_id(),
            jobs = changes.len(),
            retried = callback.retried,
            error = %message,
            "Delivery retries exhausted"
        );

        self.apply_changes(payload.batch_id(), changes).await
    }

    /// Best-effort terminal error from the heterogeneous failure shapes.
    fn failure_message(callback: &QueueCallback) -> AppResult<String> {
        if let Some(error) = &callback.error {
            return Ok(extract_error_message(error));
        }
        if let Some(report) = callback.decode_worker_report()? {
            if let Some(error) = &report.error {
                return Ok(extract_error_message(error));
            }
        }
        Ok("delivery retries exhausted".to_string())
    }

    fn classify_batch_results(report: &WorkerReport) -> Vec<JobChange> {
        report
            .results
            .iter()
            .map(|result| match &result.provider_message_id {
                Some(provider_id) => JobChange::completed(result.job_id, provider_id.clone()),
                None => {
                    let message = result
                        .error
                        .as_ref()
                        .map(extract_error_message)
                        .unwrap_or_else(|| "delivery failed".to_string());
                    JobChange::failed(result.job_id, message)
                }
            })
            .collect()
    }

    fn classify_single_result(job_id: Uuid, report: Option<&WorkerReport>) -> Vec<JobChange> {
        match report {
            Some(report) => match &report.provider_message_id {
                Some(provider_id) => vec![JobChange::completed(job_id, provider_id.clone())],
                None => {
                    let message = report
                        .error
                        .as_ref()
                        .map(extract_error_message)
                        .unwrap_or_else(|| "delivery failed".to_string());
                    vec![JobChange::failed(job_id, message)]
                }
            },
            // No body captured but the queue reported success; record the
            // completion without a provider id rather than dropping it.
            None => vec![JobChange {
                job_id,
                status: JobStatus::Completed,
                provider_message_id: None,
                error: None,
            }],
        }
    }

    /// One bulk update, dead-letter appends for newly failed jobs, then the
    /// aggregate recompute. Outcomes that hit the terminal guard are logged
    /// and skipped, never treated as errors.
    async fn apply_changes(
        &self,
        batch_id: Uuid,
        changes: Vec<JobChange>,
    ) -> AppResult<CallbackReport> {
        let outcomes = self.job_repo.update_statuses_bulk(changes).await?;
        let mut report = CallbackReport::default();

        for (change, outcome) in &outcomes {
            match outcome {
                UpdateOutcome::Applied(job) => {
                    report.applied += 1;
                    if job.status == JobStatus::Failed {
                        let error = change.error.as_deref().unwrap_or("delivery failed");
                        self.dead_letter_repo.append(job, error).await?;
                        report.dead_lettered += 1;
                        tracing::warn!(
                            job_id = %job.id,
                            batch_id = %job.batch_id,
                            session_id = %job.session_id,
                            job_type = %job.job_type,
                            recipient = %job.recipient_email,
                            attempts = job.attempts,
                            error = %error,
                            "Job failed; dead-letter entry recorded"
                        );
                    }
                }
                UpdateOutcome::Noop => {
                    report.noop += 1;
                    tracing::debug!(job_id = %change.job_id, "Duplicate status report ignored");
                }
                UpdateOutcome::Rejected { current } => {
                    report.rejected += 1;
                    tracing::warn!(
                        job_id = %change.job_id,
                        current = %current,
                        requested = %change.status,
                        "Out-of-order status report skipped"
                    );
                }
                UpdateOutcome::Missing => {
                    report.missing += 1;
                    tracing::warn!(job_id = %change.job_id, "Status report for unknown job");
                }
            }
        }

        self.aggregator.recompute(batch_id).await?;
        Ok(report)
    }
}

// Re-exported for handler logging.
impl CallbackReport {
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "applied": self.applied,
            "noop": self.noop,
            "rejected": self.rejected,
            "missing": self.missing,
            "dead_lettered": self.dead_lettered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report_from(value: Value) -> WorkerReport {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_batch_results_classified_by_provider_id() {
        let ok_id = Uuid::new_v4();
        let bad_id = Uuid::new_v4();
        let report = report_from(json!({
            "results": [
                {"job_id": ok_id, "provider_message_id": "prov_1"},
                {"job_id": bad_id, "error": {"message": "bounced"}}
            ]
        }));

        let changes = CallbackService::classify_batch_results(&report);
        assert_eq!(changes.len(), 2);

        assert_eq!(changes[0].job_id, ok_id);
        assert_eq!(changes[0].status, JobStatus::Completed);
        assert_eq!(changes[0].provider_message_id.as_deref(), Some("prov_1"));

        assert_eq!(changes[1].job_id, bad_id);
        assert_eq!(changes[1].status, JobStatus::Failed);
        assert_eq!(changes[1].error.as_deref(), Some("bounced"));
    }

    #[test]
    fn test_single_result_completed() {
        let job_id = Uuid::new_v4();
        let report = report_from(json!({"provider_message_id": "prov_9"}));

        let changes = CallbackService::classify_single_result(job_id, Some(&report));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, JobStatus::Completed);
        assert_eq!(changes[0].provider_message_id.as_deref(), Some("prov_9"));
    }

    #[test]
    fn test_single_result_without_body_still_completes() {
        let job_id = Uuid::new_v4();
        let changes = CallbackService::classify_single_result(job_id, None);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, JobStatus::Completed);
        assert!(changes[0].provider_message_id.is_none());
    }

    #[test]
    fn test_failure_message_prefers_top_level_error() {
        use base64::Engine;
        let callback = QueueCallback {
            status: Some(500),
            source_message_id: None,
            source_body: base64::engine::general_purpose::STANDARD.encode(b"{}"),
            body: None,
            retried: Some(3),
            error: Some(json!({"message": "provider unavailable"})),
        };
        assert_eq!(
            CallbackService::failure_message(&callback).unwrap(),
            "provider unavailable"
        );
    }

    #[test]
    fn test_failure_message_falls_back_to_placeholder() {
        use base64::Engine;
        let callback = QueueCallback {
            status: None,
            source_message_id: None,
            source_body: base64::engine::general_purpose::STANDARD.encode(b"{}"),
            body: None,
            retried: None,
            error: None,
        };
        assert_eq!(
            CallbackService::failure_message(&callback).unwrap(),
            "delivery retries exhausted"
        );
    }
}
