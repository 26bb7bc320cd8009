//! # aquaroute-db: Database Layer for AquaRoute
//!
//! SQLite persistence for the back office: pool, embedded migrations,
//! repositories, and the transactional order/route finalizers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AquaRoute Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /api/sessions/{id}/finalize)                       │
//! │       │  plan = aquaroute_core::finalize::plan_order(..)               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  aquaroute-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ OrderRepo      │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ RouteRepo      │    │ _schema.sql  │  │   │
//! │  │   │ WAL, FKs on   │    │ InventoryRepo  │    │              │  │   │
//! │  │   │               │    │ Customer, ...  │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (aquaroute.db)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aquaroute_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("aquaroute.db")).await?;
//!
//! let plan = plan_order(Some(&customer), &cart, PaymentMethod::Cash, SalesChannel::InPerson, None)?;
//! let saved = db.orders().finalize(&plan, &actor.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::expense::{ExpenseRepository, NewExpense};
pub use repository::inventory::{InventoryRepository, NewMovement, ProductStock};
pub use repository::order::{OrderFilter, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::route::RouteRepository;
