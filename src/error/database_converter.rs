use std::sync::OnceLock;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use regex::Regex;

use crate::error::AppError;

/// Utility for converting database errors to structured AppError variants.
///
/// Transforms Diesel errors into AppError variants, extracting entity/field
/// information from Postgres constraint violation messages where possible.
pub struct DatabaseErrorConverter;

struct Patterns {
    key_value: Regex,
    column_name: Regex,
    table_name: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        // "Key (field)=(value)" in Postgres DETAIL lines
        key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").unwrap(),
        column_name: Regex::new(r#"column "([^"]+)""#).unwrap(),
        table_name: Regex::new(r#"(?:table|relation) "([^"]+)""#).unwrap(),
    })
}

impl DatabaseErrorConverter {
    /// Converts a Diesel error to an appropriate AppError variant.
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let constraint = info.constraint_name().map(|c| c.to_string());
                Self::convert_database_error(kind, &message, constraint.as_deref(), operation)
            }
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    fn convert_database_error(
        kind: DatabaseErrorKind,
        message: &str,
        constraint: Option<&str>,
        operation: &str,
    ) -> AppError {
        match kind {
            DatabaseErrorKind::UniqueViolation => {
                let entity = Self::table_from(message)
                    .or_else(|| constraint.and_then(Self::entity_from_constraint))
                    .unwrap_or_else(|| "resource".to_string());
                if let Some((field, value)) = Self::key_value_from(message) {
                    AppError::Duplicate {
                        entity,
                        field,
                        value,
                    }
                } else {
                    AppError::Database {
                        operation: operation.to_string(),
                        source: anyhow::Error::msg(format!(
                            "Unique constraint violation: {}",
                            message
                        )),
                    }
                }
            }
            DatabaseErrorKind::NotNullViolation => {
                if let Some(field) = Self::column_from(message) {
                    AppError::Validation {
                        field,
                        reason: "Field is required".to_string(),
                    }
                } else {
                    AppError::Database {
                        operation: operation.to_string(),
                        source: anyhow::Error::msg(format!(
                            "Not null constraint violation: {}",
                            message
                        )),
                    }
                }
            }
            DatabaseErrorKind::ForeignKeyViolation => {
                if let Some((field, value)) = Self::key_value_from(message) {
                    AppError::Validation {
                        field,
                        reason: format!("Invalid reference '{}'", value),
                    }
                } else {
                    AppError::Database {
                        operation: operation.to_string(),
                        source: anyhow::Error::msg(format!(
                            "Foreign key constraint violation: {}",
                            message
                        )),
                    }
                }
            }
            _ => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::msg(format!("Database error: {}", message)),
            },
        }
    }

    fn key_value_from(message: &str) -> Option<(String, String)> {
        patterns().key_value.captures(message).and_then(|caps| {
            let field = caps.get(1)?.as_str().to_string();
            let value = caps.get(2)?.as_str().to_string();
            Some((field, value))
        })
    }

    fn column_from(message: &str) -> Option<String> {
        patterns()
            .column_name
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn table_from(message: &str) -> Option<String> {
        patterns()
            .table_name
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// "notification_jobs_pkey" -> "notification_jobs" (best effort).
    fn entity_from_constraint(constraint: &str) -> Option<String> {
        constraint
            .rsplit_once('_')
            .map(|(prefix, _)| prefix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockInfo {
        message: String,
        constraint_name: Option<String>,
    }

    impl diesel::result::DatabaseErrorInformation for MockInfo {
        fn message(&self) -> &str {
            &self.message
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint_name.as_deref()
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[test]
    fn test_convert_not_found_error() {
        let result = DatabaseErrorConverter::convert_diesel_error(DieselError::NotFound, "find job");
        match result {
            AppError::NotFound { entity, field, .. } => {
                assert_eq!(entity, "resource");
                assert_eq!(field, "id");
            }
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_convert_unique_violation() {
        let info = MockInfo {
            message: "duplicate key value violates unique constraint \"notification_jobs_pkey\"\nDETAIL: Key (id)=(8f14e45f-ceea-4672-950c-55f0f34fd1b8) already exists.".to_string(),
            constraint_name: Some("notification_jobs_pkey".to_string()),
        };
        let error = DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, Box::new(info));

        let result = DatabaseErrorConverter::convert_diesel_error(error, "insert job");
        match result {
            AppError::Duplicate {
                entity,
                field,
                value,
            } => {
                assert_eq!(entity, "notification_jobs");
                assert_eq!(field, "id");
                assert_eq!(value, "8f14e45f-ceea-4672-950c-55f0f34fd1b8");
            }
            other => panic!("Expected Duplicate error, got: {:?}", other),
        }
    }

    #[test]
    fn test_convert_not_null_violation() {
        let info = MockInfo {
            message: "null value in column \"recipient_email\" of relation \"notification_jobs\" violates not-null constraint".to_string(),
            constraint_name: None,
        };
        let error = DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, Box::new(info));

        let result = DatabaseErrorConverter::convert_diesel_error(error, "insert job");
        match result {
            AppError::Validation { field, reason } => {
                assert_eq!(field, "recipient_email");
                assert!(reason.contains("required"));
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_convert_foreign_key_violation() {
        let info = MockInfo {
            message: "insert or update on table \"notification_jobs\" violates foreign key constraint \"notification_jobs_batch_id_fkey\"\nDETAIL: Key (batch_id)=(0f0e4401-27bb-4c2f-b2e6-0f6ad9f3a1d0) is not present in table \"notification_batches\".".to_string(),
            constraint_name: Some("notification_jobs_batch_id_fkey".to_string()),
        };
        let error =
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, Box::new(info));

        let result = DatabaseErrorConverter::convert_diesel_error(error, "insert job");
        match result {
            AppError::Validation { field, reason } => {
                assert_eq!(field, "batch_id");
                assert!(reason.contains("Invalid reference"));
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_violation_falls_back_to_database_error() {
        let info = MockInfo {
            message: "something unexpected".to_string(),
            constraint_name: None,
        };
        let error = DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, Box::new(info));

        let result = DatabaseErrorConverter::convert_diesel_error(error, "insert job");
        assert!(matches!(result, AppError::Database { .. }));
    }
}
