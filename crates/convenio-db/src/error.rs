//! # Store Errors
//!
//! SQLite reports constraint failures as message text; this module turns
//! them into variants the server can map to status codes.
//!
//! ```text
//! sqlx::Error ──► DbError ──► ApiError (apps/server)
//!
//! "UNIQUE constraint failed: clients.tax_id"   → UniqueViolation  → 409 DUPLICATE
//! "FOREIGN KEY constraint failed"              → ForeignKeyViolation → 409
//! lost client-version compare-and-set          → Conflict         → 409
//! anything else                                → QueryFailed / Internal → 500
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A second client with the same tax ID, a reused username, EAN or
    /// fiscal code. `field` is the `table.column` SQLite reports.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A RESTRICT delete (a client with issuances, an issuance with sales)
    /// or a reference to a missing row.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A concurrent write changed the data this write was based on.
    ///
    /// ## When This Occurs
    /// - Two issuances for the same client validated against the same
    ///   client version; the second one to commit loses
    /// - The client's balance dropped below the value between validation
    ///   and the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// SQLite gave up waiting for a lock (`SQLITE_BUSY` / `SQLITE_LOCKED`).
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin or commit failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Lock contention reads as a lost race: the caller should resubmit.
    pub fn contended(self) -> Self {
        match self {
            DbError::Busy(message) => DbError::Conflict(format!(
                "Another operation was writing at the same time ({}). Resubmit.",
                message
            )),
            other => other,
        }
    }

    /// The column a unique violation was raised on (`clients.tax_id` → `tax_id`).
    pub fn unique_column(&self) -> Option<&str> {
        match self {
            DbError::UniqueViolation { field, .. } => {
                let first = field.split(',').next().unwrap_or(field).trim();
                Some(first.rsplit('.').next().unwrap_or(first))
            }
            _ => None,
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), extended codes included.
fn is_busy(code: Option<&str>, message: &str) -> bool {
    match code.and_then(|c| c.parse::<i32>().ok()) {
        Some(code) => matches!(code & 0xff, 5 | 6),
        None => message.contains("database is locked") || message.contains("is busy"),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if is_busy(db_err.code().as_deref(), msg) {
                    DbError::Busy(msg.to_string())
                } else if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::duplicate(field, "unknown")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("database is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
