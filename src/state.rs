//! Application state for Axum web framework.
//!
//! Contains shared services and resources that are accessible across all
//! request handlers. Everything here is explicit injected state; there are
//! no module-level singletons.

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::db::AsyncDbPool;
use crate::error::AppResult;
use crate::queue::{DeliveryPublisher, QueueClient, SignatureVerifier};
use crate::repositories::Repositories;
use crate::services::Services;

/// Application state containing all shared services and resources.
///
/// Designed for Axum's State extractor. Cloning is cheap since services and
/// the pool use Arc internally.
#[derive(Clone)]
pub struct AppState {
    /// All business logic services
    pub services: Services,
    /// Direct access to the database connection pool (health checks)
    pub db_pool: AsyncDbPool,
    /// Callback signature verification
    pub verifier: SignatureVerifier,
}

impl AppState {
    /// Creates a new AppState from a database connection pool and settings.
    ///
    /// Initializes repositories, the queue client and all services.
    pub fn new(pool: AsyncDbPool, settings: &Settings) -> AppResult<Self> {
        let repos = Repositories::new(pool.clone());
        let publisher: Arc<dyn DeliveryPublisher> =
            Arc::new(QueueClient::new(settings.queue.clone())?);
        let services = Services::new(repos, publisher);
        let verifier = SignatureVerifier::from_config(&settings.signing);

        Ok(Self {
            services,
            db_pool: pool,
            verifier,
        })
    }
}
