use utoipa::OpenApi;

pub const SCHEDULE_TAG: &str = "Scheduling";
pub const STATUS_TAG: &str = "Status";
pub const JOB_TAG: &str = "Jobs";
pub const CALLBACK_TAG: &str = "Callbacks";
pub const MAINTENANCE_TAG: &str = "Maintenance";
pub const HEALTH_TAG: &str = "Health";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cadence",
        description = "Session notification scheduling and delivery tracking",
    ),
    paths(
        crate::api::handlers::schedule::schedule_session,
        crate::api::handlers::schedule::schedule_bulk,
        crate::api::handlers::status::query_status,
        crate::api::handlers::status::list_batch_jobs,
        crate::api::handlers::status::list_dead_letters,
        crate::api::handlers::jobs::retry_job,
        crate::api::handlers::jobs::resend_job,
        crate::api::handlers::jobs::cancel_message,
        crate::api::handlers::callbacks::delivery_callback,
        crate::api::handlers::callbacks::delivery_failure,
        crate::api::handlers::maintenance::recalculate_batch,
        crate::api::handlers::maintenance::recalculate_active,
        crate::api::handlers::maintenance::reconcile,
        crate::api::handlers::health::health_check,
        crate::api::handlers::health::readiness_check,
        crate::api::handlers::health::liveness_check,
    ),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
            crate::api::dto::ScheduleSessionRequest,
            crate::api::dto::BulkScheduleRequest,
            crate::api::dto::SessionEventRequest,
            crate::api::dto::RecipientRequest,
            crate::api::dto::StatusResponse,
            crate::api::dto::BatchStatusResponse,
            crate::api::dto::JobResponse,
            crate::api::dto::DeadLetterResponse,
            crate::api::handlers::maintenance::ReconcileResponse,
            crate::api::handlers::maintenance::RecalculateResponse,
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::HealthStatus,
            crate::api::handlers::health::ComponentHealth,
            crate::services::ScheduleReceipt,
            crate::services::EventOutcome,
            crate::services::BulkScheduleReport,
            crate::models::ParticipantRole,
            crate::models::JobType,
            crate::models::JobStatus,
            crate::models::BatchStatus,
        )
    ),
    tags(
        (name = SCHEDULE_TAG, description = "Session notification scheduling"),
        (name = STATUS_TAG, description = "Batch progress and dead-letter queries"),
        (name = JOB_TAG, description = "Manual job operations"),
        (name = CALLBACK_TAG, description = "Queue delivery callbacks"),
        (name = MAINTENANCE_TAG, description = "Aggregate repair and reconciliation"),
        (name = HEALTH_TAG, description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;
