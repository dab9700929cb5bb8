use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::error::AppError;

/// Converts Diesel database errors into structured AppError variants.
///
/// The schedule tables carry a partial unique index on the parent name per
/// scope; a unique violation against it becomes `DuplicateName` so callers
/// do not have to inspect constraint names themselves.
pub struct DatabaseErrorConverter;

/// Unique index guarding schedule names per scope (see migrations).
const SCOPE_NAME_INDEX: &str = "schedule_parents_scope_name_key";

impl DatabaseErrorConverter {
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let constraint = info.constraint_name().map(str::to_string);
                Self::convert_database_error(kind, message, constraint, operation)
            }
            DieselError::NotFound => AppError::NotFound {
                entity: "schedule".to_string(),
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
        message: String,
        constraint: Option<String>,
        operation: &str,
    ) -> AppError {
        match kind {
            DatabaseErrorKind::UniqueViolation
                if constraint.as_deref() == Some(SCOPE_NAME_INDEX) =>
            {
                AppError::DuplicateName {
                    name: "schedule_name".to_string(),
                }
            }
            DatabaseErrorKind::UniqueViolation => AppError::Validation {
                field: constraint.unwrap_or_else(|| "unknown".to_string()),
                reason: format!("Unique constraint violation: {}", message),
            },
            DatabaseErrorKind::CheckViolation => AppError::Validation {
                field: constraint.unwrap_or_else(|| "unknown".to_string()),
                reason: format!("Check constraint failed: {}", message),
            },
            DatabaseErrorKind::ForeignKeyViolation => AppError::Validation {
                field: constraint.unwrap_or_else(|| "unknown".to_string()),
                reason: format!("Invalid reference: {}", message),
            },
            _ => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::msg(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found() {
        let err = DatabaseErrorConverter::convert_diesel_error(DieselError::NotFound, "lookup");
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn scope_name_unique_violation_maps_to_duplicate_name() {
        let err = DatabaseErrorConverter::convert_database_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key value violates unique constraint".to_string(),
            Some(SCOPE_NAME_INDEX.to_string()),
            "insert schedule",
        );
        assert!(matches!(err, AppError::DuplicateName { .. }));
    }

    #[test]
    fn other_unique_violation_maps_to_validation() {
        let err = DatabaseErrorConverter::convert_database_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key".to_string(),
            Some("schedule_occurrences_pkey".to_string()),
            "insert occurrence",
        );
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn rollback_maps_to_database_error() {
        let err = DatabaseErrorConverter::convert_diesel_error(
            DieselError::RollbackTransaction,
            "transaction",
        );
        assert!(matches!(err, AppError::Database { .. }));
    }
}
