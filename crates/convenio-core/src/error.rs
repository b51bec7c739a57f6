//! # Domain Errors
//!
//! [`ValidationError`] is one failed rule on one field. Cleaners collect
//! those into a `FormErrors` per submission; [`CoreError`] is what the
//! domain functions themselves return. `convenio-db` and the server each
//! add their own layer on top (`DbError`, `ApiError`).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors from the domain functions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// More than one client carries the same tax ID.
    ///
    /// ## When This Occurs
    /// Only when the store's uniqueness guarantee was bypassed (manual
    /// imports, legacy data). Never resolved automatically.
    #[error("Multiple clients share tax ID {0}")]
    DuplicateTaxId(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// One failed rule on one field.
///
/// One variant per rule kind. The `Display` text is what ends up next to the
/// field in a rejected form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Invalid format (digit counts, dates, decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A date precedes the date it must follow.
    #[error("{field} cannot be before {other}")]
    DateBefore { field: String, other: String },
}

impl ValidationError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
