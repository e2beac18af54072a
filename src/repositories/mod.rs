//! Repository layer for data access operations.
//!
//! Together these form the durable job store: every other component
//! coordinates exclusively through it.

mod batch_repo;
mod dead_letter_repo;
mod job_repo;

pub use batch_repo::BatchRepository;
pub use dead_letter_repo::DeadLetterRepository;
pub use job_repo::JobRepository;

use crate::db::AsyncDbPool;

/// Aggregates all repositories for convenient access.
///
/// Since `AsyncDbPool` uses `Arc` internally, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub jobs: JobRepository,
    pub batches: BatchRepository,
    pub dead_letters: DeadLetterRepository,
}

impl Repositories {
    /// Creates a new Repositories instance with all repositories initialized.
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            jobs: JobRepository::new(pool.clone()),
            batches: BatchRepository::new(pool.clone()),
            dead_letters: DeadLetterRepository::new(pool),
        }
    }
}
