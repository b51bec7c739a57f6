//! # HTTP Errors
//!
//! Every handler returns `ApiResult<T>`; this is how failures become responses.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Handler: Result<T, ApiError>                                          │
//! │       │                                                                 │
//! │       ├── FormErrors (cleaner / issuance validator) ──► 422 + errors   │
//! │       ├── DbError::NotFound ──────────────────────────► 404            │
//! │       ├── DbError::UniqueViolation ───────────────────► 409 + errors   │
//! │       ├── DbError::ForeignKeyViolation / Conflict ────► 409            │
//! │       ├── missing query parameter ────────────────────► 400            │
//! │       ├── undecodable query / body (crate::extract) ──► 400 / 415      │
//! │       └── store failure ─── logged with error! ───────► 500 (generic)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Form validation failed",
//!   "errors": {
//!     "fields": { "value": ["Transaction value (150.00) exceeds ..."] },
//!     "non_field": []
//!   }
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use convenio_core::{CoreError, FormErrors};
use convenio_db::DbError;

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Stable code clients can branch on
    pub code: ErrorCode,

    /// Message for the person filling the form
    pub message: String,

    /// Field and form-level messages, when the error belongs to a form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FormErrors>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Submitted form failed validation (422)
    ValidationError,

    /// Required query parameter missing or malformed (400)
    BadRequest,

    /// Body is not `application/x-www-form-urlencoded` (415)
    UnsupportedMediaType,

    /// Unique key already taken (409)
    Duplicate,

    /// Record is still referenced, or references a missing record (409)
    ReferenceViolation,

    /// Concurrent write won; resubmit (409)
    Conflict,

    /// Stored data breaks an invariant, needs manual intervention (409)
    DataIntegrity,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCode::Duplicate
            | ErrorCode::ReferenceViolation
            | ErrorCode::Conflict
            | ErrorCode::DataIntegrity => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            errors: None,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// A form rejection carrying its field and form-level messages.
    pub fn form(errors: FormErrors) -> Self {
        ApiError {
            code: ErrorCode::ValidationError,
            message: "Form validation failed".to_string(),
            errors: Some(errors),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BadRequest, message)
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::DataIntegrity, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl From<FormErrors> for ApiError {
    fn from(errors: FormErrors) -> Self {
        ApiError::form(errors)
    }
}

/// Store errors; only the mapped message reaches the caller.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { .. } => {
                let column = err.unique_column().unwrap_or("value").to_string();
                let mut errors = FormErrors::new();
                errors.add(column.as_str(), "A record with this value already exists.");
                ApiError {
                    code: ErrorCode::Duplicate,
                    message: format!("Duplicate {}", column),
                    errors: Some(errors),
                }
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(%message, "Foreign key violation");
                ApiError::new(
                    ErrorCode::ReferenceViolation,
                    "The record is referenced by other records, or references a missing one",
                )
            }
            DbError::Conflict(message) => ApiError::new(ErrorCode::Conflict, message),
            DbError::Busy(message) => {
                tracing::warn!(%message, "Database busy");
                ApiError::new(ErrorCode::Conflict, "The database was busy. Resubmit.")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!(error = %e, "Store query failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!(error = %e, "Store transaction failed");
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!(error = %e, "Unexpected store error");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Domain errors from outside a cleaner.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DuplicateTaxId(_) => {
                ApiError::data_integrity("Multiple clients share this tax ID. Contact support.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
