//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──► InvoiceRepository callers see DbError directly              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError::LookupFailed ← at the CatalogLookup boundary               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Editor shows "catalog unavailable", manual entry keeps working       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

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
    /// - Inserting a duplicate SKU
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A product failed the catalog's format rules on insert.
    #[error("Invalid product: {0}")]
    Validation(#[from] ValidationError),

    /// A JSON column (snapshot, override) could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value has the wrong shape (e.g. unparseable decimal text).
    #[error("Invalid value in column {column}: {reason}")]
    InvalidColumn { column: String, reason: String },

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

    /// Creates an InvalidColumn error.
    pub fn invalid_column(column: impl Into<String>, reason: impl ToString) -> Self {
        DbError::InvalidColumn {
            column: column.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → UniqueViolation, else Internal
/// sqlx::Error::ColumnDecode   → DbError::InvalidColumn
/// sqlx::Error::PoolTimedOut   → DbError::ConnectionFailed
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
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else {
                    DbError::Internal(msg.to_string())
                }
            }

            sqlx::Error::ColumnDecode { index, source } => DbError::InvalidColumn {
                column: index,
                reason: source.to_string(),
            },

            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionFailed("Timed out waiting for a connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Internal(format!("migration: {}", err))
    }
}

/// Storage failures reach the engine only as lookup failures.
impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        CoreError::LookupFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_becomes_lookup_failure() {
        let core: CoreError = DbError::ConnectionFailed("Pool is closed".to_string()).into();
        match core {
            CoreError::LookupFailed(msg) => assert!(msg.contains("Pool is closed")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_helpers() {
        assert_eq!(
            DbError::not_found("Invoice", "inv-1").to_string(),
            "Invoice not found: inv-1"
        );
        assert_eq!(
            DbError::invalid_column("quantity", "not a number").to_string(),
            "Invalid value in column quantity: not a number"
        );
    }
}
