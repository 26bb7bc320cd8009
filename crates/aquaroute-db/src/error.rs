//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Domain rule (CoreError)             │
//! │       │                                   │                             │
//! │       ▼                                   │                             │
//! │  DbError (this module)  ◄─────────────────┘  passed through as Core    │
//! │       │                                                                 │
//! │       │  finalize/edit/cancel failures are wrapped in                  │
//! │       │  Step { step: "insert order items", source }                   │
//! │       ▼                                                                 │
//! │  ApiError (backoffice) ← { code, message } + HTTP status               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use aquaroute_core::CoreError;
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
    /// - Duplicate product code
    /// - Duplicate customer code or RUT
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A domain rule rejected the operation (stock, validation, status).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A multi-step write failed part way; the transaction was rolled back.
    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<DbError>,
    },

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

    /// Tags a store failure with the write step it happened in.
    ///
    /// Domain errors are left as they are so callers can still match on
    /// `InsufficientStock` and friends.
    ///
    /// ## Example
    /// ```rust,ignore
    /// sqlx::query("INSERT INTO orders ...")
    ///     .execute(&mut *tx)
    ///     .await
    ///     .map_err(|e| DbError::at("insert order header", e))?;
    /// ```
    pub fn at(step: &'static str, err: impl Into<DbError>) -> Self {
        match err.into() {
            core @ DbError::Core(_) => core,
            step_err @ DbError::Step { .. } => step_err,
            other => DbError::Step {
                step,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through `Step` wrappers.
    pub fn root(&self) -> &DbError {
        match self {
            DbError::Step { source, .. } => source.root(),
            other => other,
        }
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

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
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

impl From<aquaroute_core::ValidationError> for DbError {
    fn from(err: aquaroute_core::ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wraps_store_errors_only() {
        let wrapped = DbError::at("insert order items", DbError::QueryFailed("disk I/O".into()));
        assert_eq!(wrapped.to_string(), "insert order items failed: Query failed: disk I/O");
        assert!(matches!(wrapped.root(), DbError::QueryFailed(_)));

        let core = DbError::at("check stock", CoreError::EmptyCart);
        assert!(matches!(core, DbError::Core(CoreError::EmptyCart)));
    }

    #[test]
    fn test_step_keeps_innermost_label() {
        let inner = DbError::at("apply movement", DbError::PoolExhausted);
        let outer = DbError::at("finalize order", inner);
        assert!(outer.to_string().starts_with("apply movement failed"));
    }
}
