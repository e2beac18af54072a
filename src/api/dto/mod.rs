//! Data Transfer Objects for API requests and responses.
//!
//! DTOs are organized by domain:
//! - `schedule` - scheduling request DTOs
//! - `status` - batch/job status and dead-letter response DTOs
//! - `error` - common error response DTOs

mod error;
mod schedule;
mod status;

pub use error::ErrorResponse;
pub use schedule::{BulkScheduleRequest, RecipientRequest, ScheduleSessionRequest, SessionEventRequest};
pub use status::{
    BatchStatusResponse, DeadLetterParams, DeadLetterResponse, JobResponse,
    POLL_INTERVAL_ACTIVE_SECONDS, POLL_INTERVAL_IDLE_SECONDS, StatusQueryParams, StatusResponse,
    TERMINAL_GRACE_SECONDS,
};
