//! In-process maintenance scheduler.
//!
//! Runs the two repair operations on cron schedules: the reconciliation
//! sweep (re-publish pending jobs whose publish was interrupted) and the
//! active-batch recalculation. Both are also reachable on demand through
//! the maintenance API.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};

use crate::config::settings::MaintenanceConfig;
use crate::error::{AppError, AppResult};
use crate::services::Services;

/// Wrapper around tokio-cron-scheduler driving the periodic repairs.
pub struct MaintenanceScheduler {
    scheduler: Arc<Mutex<TokioCronScheduler>>,
    services: Services,
    config: MaintenanceConfig,
}

impl MaintenanceScheduler {
    pub async fn new(services: Services, config: MaintenanceConfig) -> AppResult<Self> {
        let scheduler = TokioCronScheduler::new()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            services,
            config,
        })
    }

    /// Registers both repair jobs and starts the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        self.register_reconcile().await?;
        self.register_recalculate().await?;

        self.scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        tracing::info!(
            reconcile_cron = %self.config.reconcile_cron,
            recalculate_cron = %self.config.recalculate_cron,
            "Maintenance scheduler started"
        );
        Ok(())
    }

    /// Stop the scheduler gracefully.
    pub async fn stop(&self) -> AppResult<()> {
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }

    async fn register_reconcile(&self) -> AppResult<()> {
        let services = self.services.clone();
        let job = Job::new_async(self.config.reconcile_cron.as_str(), move |_uuid, _lock| {
            let services = services.clone();
            Box::pin(async move {
                if let Err(e) = services.scheduler.reconcile_unpublished().await {
                    tracing::error!(error = %e, "Reconciliation sweep failed");
                }
            })
        })
        .map_err(|e| AppError::Configuration {
            key: "maintenance.reconcile_cron".to_string(),
            source: anyhow::anyhow!("Invalid cron expression: {}", e),
        })?;

        self.scheduler
            .lock()
            .await
            .add(job)
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }

    async fn register_recalculate(&self) -> AppResult<()> {
        let services = self.services.clone();
        let job = Job::new_async(
            self.config.recalculate_cron.as_str(),
            move |_uuid, _lock| {
                let services = services.clone();
                Box::pin(async move {
                    if let Err(e) = services.aggregator.recalculate_active().await {
                        tracing::error!(error = %e, "Active batch recalculation failed");
                    }
                })
            },
        )
        .map_err(|e| AppError::Configuration {
            key: "maintenance.recalculate_cron".to_string(),
            source: anyhow::anyhow!("Invalid cron expression: {}", e),
        })?;

        self.scheduler
            .lock()
            .await
            .add(job)
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }
}
