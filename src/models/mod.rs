//! Domain models for the notification scheduling engine.
//!
//! Models are organized by aggregate:
//! - `enums` - status/type enums shared across tables plus the transition rules
//! - `job` - per-recipient notification job records
//! - `batch` - batch records and the roll-up derivation
//! - `dead_letter` - append-only failure audit records
//! - `event` - the inbound domain event boundary

mod batch;
mod dead_letter;
mod enums;
mod event;
mod job;

pub use batch::{BatchRollup, NewNotificationBatch, NotificationBatch, SESSION_BATCH_KIND};
pub use dead_letter::{DeadLetterEntry, NewDeadLetterEntry};
pub use enums::{BatchStatus, JobStatus, JobType, TransitionOutcome, plan_transition, prior_statuses};
pub use event::{ParticipantRole, SessionEvent, SessionRecipient};
pub use job::{JobChange, JobPatch, NewNotificationJob, NotificationJob, UpdateOutcome};
