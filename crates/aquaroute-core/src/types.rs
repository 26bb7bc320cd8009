//! # Domain Types
//!
//! Core domain types used throughout AquaRoute.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Order      │   │  DeliveryRoute  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code CLI001    │◄──│  customer_id    │   │  customer_id    │──►    │
//! │  │  tax_id (RUT)   │   │  order_number   │   │  sequence, date │       │
//! │  │  bottles_owned  │   │  status         │   │  bottle figures │       │
//! │  │  bottles_lent   │   │  payment_*      │   │  delivery_status│       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ owns                 │ owns           │
//! │                        ┌────────▼────────┐   ┌────────▼─────────┐      │
//! │                        │   OrderItem     │   │DeliveryRouteItem │      │
//! │                        │  unit_price     │   │  unit_price      │      │
//! │                        │  (snapshot)     │   │  (snapshot)      │      │
//! │                        └─────────────────┘   └──────────────────┘      │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │◄──│  InventoryItem  │◄──│ InventoryMovement   │   │
//! │  │  code, price    │   │  quantity ≥ 0   │   │  append-only, delta │   │
//! │  │  affects_bottle │   │  location/state │   │  previous → new     │   │
//! │  │  _deposit       │   └─────────────────┘   └─────────────────────┘   │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4, immutable, used for relations
//! - A business key (`code`, `order_number`, `route_number`) shown to staff

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (1 bps = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Chilean VAT (IVA), 19%.
    pub const IVA: TaxRate = TaxRate(1900);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::IVA
    }
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProductCategory {
    /// Bottled water and refills.
    Water,
    /// Dispensers (sold or loaned).
    Dispenser,
    /// Pumps, taps, stands.
    Accessory,
    /// Bundles.
    Pack,
}

/// A catalog product.
///
/// `price` is tax-exclusive; [`Product::price_with_tax`] derives the shelf
/// price shown next to it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human code, e.g. `REC-20L`.
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    pub category: ProductCategory,

    /// Unit price, tax-exclusive.
    pub price: Money,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// Selling this product hands a returnable bottle to the customer.
    pub affects_bottle_deposit: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price_with_tax(&self, rate: TaxRate) -> Money {
        self.price.with_tax(rate)
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CustomerKind {
    /// Households. Tax ID optional.
    Personal,
    /// Companies. Tax ID required for invoicing.
    Business,
}

/// A customer record.
///
/// `bottles_owned` counts bottles the customer bought outright;
/// `bottles_lent` counts company bottles currently at their address.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,

    /// Business code (`CLI001`).
    pub code: String,

    /// National tax ID (RUT), e.g. `12.345.678-9`.
    pub tax_id: Option<String>,

    pub name: String,

    pub kind: CustomerKind,

    pub street: String,
    pub street_number: String,
    pub district: String,
    pub city: String,
    /// Delivery hint ("blue gate, ring twice").
    pub reference: Option<String>,

    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub comments: Option<String>,

    pub bottles_owned: i64,
    pub bottles_lent: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum InventoryLocation {
    Warehouse,
    Route,
    Customer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum InventoryStatus {
    Available,
    Reserved,
    Loaned,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ItemCondition {
    New,
    Used,
    Repaired,
}

/// On-hand stock of one product at one location.
///
/// ## Invariants
/// - `quantity >= 0`
/// - `quantity` equals the sum of this item's movement deltas
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub location: InventoryLocation,
    pub status: InventoryStatus,
    pub condition: ItemCondition,
    #[ts(as = "Option<String>")]
    pub last_count_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MovementKind {
    In,
    Out,
    Adjustment,
    Loan,
    Return,
}

/// Why a movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MovementReason {
    /// Line of a finalized order.
    Order,
    /// Reversal of an order's previous lines before an edit.
    OrderEdit,
    /// Reversal of a cancelled order.
    OrderCancel,
    /// Line of a finalized delivery route.
    Route,
    RouteEdit,
    RouteCancel,
    /// Manual count correction or restock.
    Adjustment,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Order => "order",
            MovementReason::OrderEdit => "order_edit",
            MovementReason::OrderCancel => "order_cancel",
            MovementReason::Route => "route",
            MovementReason::RouteEdit => "route_edit",
            MovementReason::RouteCancel => "route_cancel",
            MovementReason::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for MovementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub inventory_id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Signed change applied to the item.
    pub delta: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    /// Order or route that caused the movement, if any.
    pub order_ref: Option<String>,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Low-stock threshold for one product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryAlert {
    pub id: String,
    pub product_id: String,
    /// At or below this, the product shows up as low stock.
    pub min_quantity: i64,
    /// Suggested restock quantity.
    pub alert_quantity: i64,
    pub enabled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// Lifecycle: `draft → confirmed → cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Card,
    /// Goods delivered now, collected later.
    Pending,
}

impl PaymentMethod {
    /// Payment status implied by the method: pending iff the method is
    /// `Pending`.
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Pending => PaymentStatus::Pending,
            _ => PaymentStatus::Paid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SalesChannel {
    InPerson,
    Mobile,
    ScheduledRoute,
}

/// A sale header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human number, `V-YYYYMMDD-NNNN`.
    pub order_number: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub channel: SalesChannel,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line item in an order.
/// Uses snapshot pattern: `unit_price` is frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// `quantity × unit_price`.
    pub line_total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An order together with its lines, as returned by finalize and get.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Delivery Route
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DeliveryStatus {
    Pending,
    Completed,
    Cancelled,
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        DeliveryStatus::Pending
    }
}

/// A scheduled delivery: an order variant carrying bottle figures.
///
/// `bottles_in_circulation` and `bottles_owned` are copies of the customer's
/// counters taken when the route was created. They are never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeliveryRoute {
    pub id: String,
    /// Human number, `R-YYYYMMDD-NNNN`.
    pub route_number: String,
    pub customer_id: String,
    /// Stop number within the day.
    pub sequence: i64,
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub bottles_to_deliver: i64,
    pub bottles_to_collect: i64,
    pub bottles_in_circulation: i64,
    pub bottles_owned: i64,
    pub bottle_balance: i64,
    pub observation: Option<String>,
    pub delivery_status: DeliveryStatus,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeliveryRouteItem {
    pub id: String,
    pub route_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RouteWithItems {
    pub route: DeliveryRoute,
    pub items: Vec<DeliveryRouteItem>,
}

// =============================================================================
// Expense
// =============================================================================

/// An outgoing payment, counted against income in the financial summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    /// Free-form category ("fuel", "salaries", "maintenance", ...).
    pub category: String,
    pub amount: Money,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_default_is_iva() {
        let rate = TaxRate::default();
        assert_eq!(rate.bps(), 1900);
        assert!((rate.percentage() - 19.0).abs() < 0.001);
    }

    #[test]
    fn test_payment_status_follows_method() {
        assert_eq!(PaymentMethod::Pending.payment_status(), PaymentStatus::Pending);
        assert_eq!(PaymentMethod::Cash.payment_status(), PaymentStatus::Paid);
        assert_eq!(PaymentMethod::Transfer.payment_status(), PaymentStatus::Paid);
        assert_eq!(PaymentMethod::Card.payment_status(), PaymentStatus::Paid);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&SalesChannel::ScheduledRoute).unwrap(),
            "\"scheduled_route\""
        );
        assert_eq!(
            serde_json::to_string(&MovementReason::OrderEdit).unwrap(),
            "\"order_edit\""
        );
        assert_eq!(MovementReason::OrderCancel.to_string(), "order_cancel");
    }

    #[test]
    fn test_status_defaults() {
        assert_eq!(OrderStatus::default(), OrderStatus::Draft);
        assert_eq!(DeliveryStatus::default(), DeliveryStatus::Pending);
    }
}
