//! # Error Types
//!
//! Domain-specific error types for aquaroute-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  aquaroute-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  aquaroute-db errors (separate crate)                                  │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  Back-office API errors (in app)                                       │
//! │  └── ApiError         - What the front end sees (code + message)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Front end    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation and stock errors are raised before any write, so the caller's
//! cart is still intact when it sees them.

use thiserror::Error;

use crate::access::{Action, Resource, Role};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested quantity exceeds on-hand stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: REC-20L × 2
    ///      │
    ///      ▼
    /// finalize: on-hand = 1
    ///      │
    ///      ▼
    /// InsufficientStock { product: "REC-20L", requested: 2, available: 1 }
    ///      │
    ///      ▼
    /// Nothing written, cart kept, UI shows the message
    /// ```
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// A movement would leave an inventory item below zero.
    #[error("Stock for {product} cannot go negative: on hand {current}, change {delta}")]
    NegativeStock {
        product: String,
        current: i64,
        delta: i64,
    },

    /// No customer selected for an order or route.
    #[error("A customer must be selected")]
    MissingCustomer,

    /// Finalize called with no lines.
    #[error("The cart is empty")]
    EmptyCart,

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// The order/route is in a state that forbids the operation.
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidStatus {
        entity: String,
        id: String,
        status: String,
        operation: String,
    },

    #[error("Role {role:?} may not {action:?} {resource:?}")]
    PermissionDenied {
        role: Role,
        action: Action,
        resource: Resource,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required { field: field.into() }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
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
