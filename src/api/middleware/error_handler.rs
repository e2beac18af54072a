//! Error handler for converting AppError to HTTP responses.
//!
//! Implements IntoResponse for AppError with consistent status code mapping
//! and sanitized messages. Internal sources (database, upstream, config) are
//! never leaked to callers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;

impl IntoResponse for AppError {
    /// # Status Code Mapping
    /// - NotFound → 404 NOT_FOUND
    /// - Duplicate → 409 CONFLICT
    /// - Validation / BadRequest → 400 BAD_REQUEST
    /// - InvalidState → 409 CONFLICT
    /// - Signature → 401 UNAUTHORIZED
    /// - Upstream → 502 BAD_GATEWAY
    /// - Database / Configuration / Internal → 500 INTERNAL_SERVER_ERROR
    /// - ConnectionPool → 503 SERVICE_UNAVAILABLE
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::NotFound {
                entity,
                field,
                value,
            } => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", &self.to_string()).with_details(json!({
                    "entity": entity,
                    "field": field,
                    "value": value,
                })),
            ),
            AppError::Duplicate {
                entity,
                field,
                value,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse::new("DUPLICATE_ENTRY", &self.to_string()).with_details(json!({
                    "entity": entity,
                    "field": field,
                    "value": value,
                })),
            ),
            AppError::Validation { field, reason } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", &self.to_string()).with_details(json!({
                    "field": field,
                    "reason": reason,
                })),
            ),
            AppError::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message),
            ),
            AppError::InvalidState {
                entity,
                id,
                current,
                requested,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse::new("INVALID_STATE", &self.to_string()).with_details(json!({
                    "entity": entity,
                    "id": id,
                    "current": current,
                    "requested": requested,
                })),
            ),
            AppError::Signature { message } => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("SIGNATURE_REJECTED", message),
            ),
            AppError::Upstream { service, .. } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(
                    "UPSTREAM_ERROR",
                    &format!("Upstream call to {} failed", service),
                ),
            ),
            AppError::Database { operation, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(
                    "DATABASE_ERROR",
                    &format!("Database operation failed: {}", operation),
                ),
            ),
            AppError::Configuration { key, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("CONFIGURATION_ERROR", &format!("Configuration error: {}", key)),
            ),
            AppError::ConnectionPool { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("SERVICE_UNAVAILABLE", "Database connection unavailable"),
            ),
            AppError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred"),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Maps an AppError variant to its corresponding HTTP status code.
pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Duplicate { .. } => StatusCode::CONFLICT,
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::InvalidState { .. } => StatusCode::CONFLICT,
        AppError::Signature { .. } => StatusCode::UNAUTHORIZED,
        AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status_code() {
        let error = AppError::NotFound {
            entity: "notification_job".to_string(),
            field: "id".to_string(),
            value: "123".to_string(),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_status_code() {
        let error = AppError::Duplicate {
            entity: "notification_batch".to_string(),
            field: "session_id".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_state_status_code() {
        let error = AppError::InvalidState {
            entity: "notification_job".to_string(),
            id: "123".to_string(),
            current: "completed".to_string(),
            requested: "pending".to_string(),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::CONFLICT);
    }

    #[test]
    fn test_signature_status_code() {
        let error = AppError::Signature {
            message: "bad token".to_string(),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::UNAUTHORIZED);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_upstream_status_code() {
        let error = AppError::Upstream {
            service: "queue".to_string(),
            source: anyhow::anyhow!("connect timeout"),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_error_is_sanitized() {
        let error = AppError::Internal {
            source: anyhow::anyhow!("secret connection string"),
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_error_from_validator() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(email(message = "Invalid email address"))]
            email: String,
        }

        let probe = Probe {
            email: "nope".to_string(),
        };
        let error: AppError = probe.validate().unwrap_err().into();
        match &error {
            AppError::Validation { field, reason } => {
                assert_eq!(field, "email");
                assert!(reason.contains("Invalid email"));
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
        assert_eq!(error_to_status_code(&error), StatusCode::BAD_REQUEST);
    }
}
