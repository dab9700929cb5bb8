use thiserror::Error;

use crate::error::DatabaseErrorConverter;
use crate::scheduling::conflict::Conflict;

/// Application-wide error type for the schedule engine.
///
/// Business-rule violations (conflicts, immutable edits, duplicate names)
/// are distinct variants so callers can map them to precise responses;
/// only unexpected storage faults are surfaced as opaque internal errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input, caught before any I/O
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Schedule name already taken by a live parent in the same scope
    #[error("Schedule name '{name}' already exists for this scope")]
    DuplicateName { name: String },

    /// Proposed schedule collides with existing occurrences
    #[error("Schedule conflicts detected on {} date(s)", conflicts.len())]
    Conflict { conflicts: Vec<Conflict> },

    /// Every date of the schedule lies in the past; nothing may change
    #[error("Cannot edit schedule {parent_id} - all dates have passed")]
    ImmutableSchedule { parent_id: uuid::Uuid },

    /// Field is frozen in the schedule's current lifecycle phase
    #[error("Cannot change {field} for a running schedule")]
    ImmutableField { field: &'static str },

    /// One-hour lead-time guard on schedule_time changes
    #[error("New schedule time must be at least one hour from now (earliest {earliest})")]
    TooSoon { earliest: jiff::civil::DateTime },

    /// A status or update operation affected zero rows
    #[error("No records updated: {entity} may be already completed or not found")]
    NotFoundOrImmutable { entity: String },

    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Shorthand for a validation failure.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        DatabaseErrorConverter::convert_diesel_error(error, "database operation")
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        for (field, field_errors) in errors.field_errors() {
            if let Some(e) = field_errors.first() {
                let reason = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                return AppError::Validation {
                    field: field.to_string(),
                    reason,
                };
            }
        }
        AppError::Validation {
            field: "request".to_string(),
            reason: "invalid input".to_string(),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
