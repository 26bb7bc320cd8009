//! # aquaroute-core: Pure Domain Logic for AquaRoute
//!
//! The order & inventory domain model of the back office. Everything in this
//! crate is a pure function over values handed in by the caller; the database
//! layer feeds it rows and persists what it plans.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AquaRoute Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Front End                                │   │
//! │  │   Customers ──► Sale / Route form ──► Inventory ──► Reports     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/backoffice (axum)                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ aquaroute-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  cart   │ │ ledger  │ │finalize │ │  access  │ │reports │  │   │
//! │  │   │ lines + │ │ bottles │ │ plans + │ │ role ×   │ │ pure   │  │   │
//! │  │   │ totals  │ │ balance │ │ stock   │ │ action   │ │ aggr.  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                aquaroute-db (Database Layer)                    │   │
//! │  │      SQLite, migrations, repositories, transactional writes     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Order, DeliveryRoute, ...)
//! - [`money`] - Integer money and tax
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules (tax ID, codes, quantities)
//! - [`cart`] - Cart Builder
//! - [`ledger`] - Bottle-Deposit Ledger
//! - [`finalize`] - Order/route planning and stock checks
//! - [`access`] - Role-based permission check
//! - [`reports`] - Read-model aggregation
//!
//! ## Example Usage
//!
//! ```rust
//! use aquaroute_core::money::Money;
//! use aquaroute_core::types::TaxRate;
//!
//! let subtotal = Money::from_minor(2500);
//! let tax = subtotal.calculate_tax(TaxRate::IVA);
//! assert_eq!(tax.minor(), 475);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod cart;
pub mod error;
pub mod finalize;
pub mod ledger;
pub mod money;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{Action, Actor, Resource, Role};
pub use cart::{CartBuilder, CartLine, CartTotals, LineChange};
pub use error::{CoreError, CoreResult, ValidationError};
pub use finalize::{OrderPlan, PlannedLine, RouteDetails, RoutePlan};
pub use ledger::{BottleLedger, BottleSnapshot};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches slips like typing 1000 instead of 10 on the route tablet.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Prefix of generated customer codes (`CLI001`, `CLI002`, ...).
pub const CUSTOMER_CODE_PREFIX: &str = "CLI";
