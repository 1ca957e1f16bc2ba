//! Error types for `issues-lib`.

use thiserror::Error;

/// Primary error type for issues-lib operations.
#[derive(Error, Debug)]
pub enum IssuesError {
    // === Query Errors ===
    /// A list filter referenced an unknown field or carried a value that
    /// cannot be coerced to the field's type.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Field value could not be interpreted.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    // === Storage Errors ===
    /// Any failure reported by a store implementation.
    #[error("storage error: {0}")]
    Storage(String),
}

impl IssuesError {
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type using `IssuesError`.
pub type Result<T> = std::result::Result<T, IssuesError>;
