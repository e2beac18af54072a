//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between the job store
//! repositories, the queue client and the HTTP handlers.

mod aggregator;
mod callbacks;
mod scheduler;
mod status;

pub use aggregator::AggregatorService;
pub use callbacks::{CallbackReport, CallbackService};
pub use scheduler::{BulkScheduleReport, EventOutcome, ScheduleReceipt, SchedulerService};
pub use status::{StatusQuery, StatusService};

use std::sync::Arc;

use crate::queue::DeliveryPublisher;
use crate::repositories::Repositories;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap since repositories and the publisher use `Arc`
/// internally.
#[derive(Clone)]
pub struct Services {
    pub scheduler: SchedulerService,
    pub callbacks: CallbackService,
    pub aggregator: AggregatorService,
    pub status: StatusService,
}

impl Services {
    /// Creates a new Services instance from repositories and the queue
    /// publisher.
    pub fn new(repos: Repositories, publisher: Arc<dyn DeliveryPublisher>) -> Self {
        let aggregator = AggregatorService::new(repos.jobs.clone(), repos.batches.clone());
        let scheduler = SchedulerService::new(
            repos.jobs.clone(),
            repos.batches.clone(),
            aggregator.clone(),
            publisher,
        );
        let callbacks = CallbackService::new(
            repos.jobs.clone(),
            repos.dead_letters.clone(),
            aggregator.clone(),
        );
        let status = StatusService::new(
            repos.batches.clone(),
            repos.jobs.clone(),
            repos.dead_letters.clone(),
        );

        Self {
            scheduler,
            callbacks,
            aggregator,
            status,
        }
    }
}
