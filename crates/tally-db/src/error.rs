//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Ledger rule (CoreError)             │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────────────────┘                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (tally-api) ← status code + {code, message}                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger operations run inside a transaction, so a `CoreError` raised
//! half-way (insufficient stock, bad transition) must travel through the
//! same `DbResult` as storage errors. That is what [`DbError::Domain`] is for.

use tally_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate product code
    /// - Invoice or bill number collision (no retry)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A business rule rejected the operation mid-transaction.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for errors that are the caller's fault rather than storage
    /// failures. Used to pick the log level.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DbError::NotFound { .. } | DbError::UniqueViolation { .. } | DbError::Domain(_)
        )
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>"
                if let Some(target) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    let field = target
                        .rsplit('.')
                        .next()
                        .unwrap_or(target)
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let err = DbError::not_found("Sale", "abc");
        assert_eq!(err.to_string(), "Sale not found: abc");

        let err = DbError::duplicate("code", "A-001");
        assert_eq!(err.to_string(), "Duplicate code: 'A-001' already exists");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_domain_errors_pass_through() {
        let err: DbError = CoreError::InsufficientStock {
            code: "B-001".to_string(),
            available: 2,
            requested: 5,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for B-001: available 2, requested 5"
        );

        let err: DbError = ValidationError::Required {
            field: "items".to_string(),
        }
        .into();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[test]
    fn test_storage_errors_are_not_client_errors() {
        assert!(!DbError::PoolExhausted.is_client_error());
        assert!(!DbError::QueryFailed("boom".to_string()).is_client_error());
    }
}
