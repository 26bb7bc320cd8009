//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Back Office                        │
//! │                                                                         │
//! │  Handler: Result<Json<T>, ApiError>                                    │
//! │         │                                                               │
//! │         ├── CoreError::InsufficientStock ─► 409 INSUFFICIENT_STOCK     │
//! │         ├── CoreError::Validation ────────► 400 VALIDATION_ERROR       │
//! │         ├── CoreError::PermissionDenied ──► 403 PERMISSION_DENIED      │
//! │         ├── DbError::NotFound ────────────► 404 NOT_FOUND              │
//! │         ├── DbError::Step { step, .. } ───► 500 DATABASE_ERROR         │
//! │         │     (message names the failing step, detail is logged)       │
//! │         ▼                                                               │
//! │  { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock ..." } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use aquaroute_core::CoreError;
use aquaroute_db::DbError;

/// What the front end receives when a request fails:
/// ```json
/// { "code": "NOT_FOUND", "message": "Customer not found: 1b4e..." }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,

    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    /// No `x-actor-id` / `x-actor-role` headers.
    Unauthenticated,
    PermissionDenied,
    InsufficientStock,
    NegativeStock,
    /// Order or route state forbids the operation.
    InvalidStatus,
    CartError,
    Conflict,
    DatabaseError,
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthenticated, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => ApiError::from(core),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                StatusCode::CONFLICT,
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(
                    StatusCode::CONFLICT,
                    ErrorCode::Conflict,
                    "The record is still referenced by other records",
                )
            }
            DbError::Step { step, source } => {
                tracing::error!(step, error = %source, "Write step failed, rolled back");
                match *source {
                    // A lost race on the floor-checked update surfaces here
                    DbError::Core(core) => ApiError::from(core),
                    DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
                    _ => ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::DatabaseError,
                        format!("Could not {}; nothing was saved", step),
                    ),
                }
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::DatabaseError,
                "Database unavailable",
            ),
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DatabaseError,
                    "Database operation failed",
                )
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            CoreError::InsufficientStock { .. } => (StatusCode::CONFLICT, ErrorCode::InsufficientStock),
            CoreError::NegativeStock { .. } => (StatusCode::CONFLICT, ErrorCode::NegativeStock),
            CoreError::MissingCustomer | CoreError::Validation(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::ValidationError)
            }
            CoreError::EmptyCart | CoreError::CartTooLarge { .. } => {
                (StatusCode::BAD_REQUEST, ErrorCode::CartError)
            }
            CoreError::QuantityTooLarge { .. } => {
                (StatusCode::BAD_REQUEST, ErrorCode::ValidationError)
            }
            CoreError::InvalidStatus { .. } => (StatusCode::CONFLICT, ErrorCode::InvalidStatus),
            CoreError::PermissionDenied { .. } => {
                (StatusCode::FORBIDDEN, ErrorCode::PermissionDenied)
            }
        };
        ApiError::new(status, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_error_keeps_message() {
        let err = ApiError::from(DbError::Core(CoreError::InsufficientStock {
            product: "BID-20L".to_string(),
            requested: 2,
            available: 1,
        }));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("requested 2, available 1"));
    }

    #[test]
    fn test_step_failure_names_step() {
        let err = ApiError::from(DbError::at(
            "insert order items",
            DbError::QueryFailed("disk I/O error".to_string()),
        ));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("insert order items"));
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::not_found("Order", "o-1")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Order not found: o-1");
        assert!(json.get("status").is_none());
    }
}
