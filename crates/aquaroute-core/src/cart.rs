//! # Cart Builder
//!
//! Accumulates products and quantities for a pending sale or delivery and
//! recomputes totals on demand.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Builder Operations                              │
//! │                                                                         │
//! │  add_line(product, on_hand)                                            │
//! │    ├── already in cart? quantity += 1                                  │
//! │    ├── else append { quantity: 1, unit_price: product.price }          │
//! │    └── on_hand − in_cart ≤ 0? no-op                                    │
//! │                                                                         │
//! │  set_line_quantity(product_id, qty, on_hand)                           │
//! │    ├── qty < 1 or unknown product? no-op                               │
//! │    └── qty capped at on_hand                                           │
//! │                                                                         │
//! │  remove_line(product_id)                                               │
//! │                                                                         │
//! │  totals() → { subtotal, tax (once, half-up), total }                   │
//! │                                                                         │
//! │  Every effective mutation returns a LineChange { previous, current }   │
//! │  so the bottle ledger can follow deposit-bearing lines.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Snapshot
//! A line keeps the unit price captured when it was first added, even if the
//! catalog price changes while the cart is open.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, TaxRate};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,

    /// Code at time of adding (frozen).
    pub code: String,

    /// Name at time of adding (frozen).
    pub name: String,

    /// Tax-exclusive unit price at time of adding (frozen).
    pub unit_price: Money,

    pub quantity: i64,

    pub affects_bottle_deposit: bool,
}

impl CartLine {
    /// Captures a product at quantity 1.
    pub fn from_product(product: &Product) -> Self {
        CartLine {
            product_id: product.id.clone(),
            code: product.code.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
            affects_bottle_deposit: product.affects_bottle_deposit,
        }
    }

    /// `quantity × unit_price`.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Line Change
// =============================================================================

/// Quantity transition of one line, reported by every effective mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineChange {
    pub product_id: String,
    /// Quantity before the mutation (0 for a new line).
    pub previous: i64,
    /// Quantity after the mutation (0 for a removed line).
    pub current: i64,
    pub affects_bottle_deposit: bool,
}

impl LineChange {
    #[inline]
    pub fn delta(&self) -> i64 {
        self.current - self.previous
    }
}

// =============================================================================
// Totals
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

// =============================================================================
// Cart Builder
// =============================================================================

/// The cart for one in-progress sale or route.
///
/// ## Invariants
/// - Lines are unique by `product_id`, in insertion order
/// - Every line has `1 <= quantity <= MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartBuilder {
    lines: Vec<CartLine>,
    tax_rate: TaxRate,
}

impl Default for CartBuilder {
    fn default() -> Self {
        CartBuilder::new(TaxRate::default())
    }
}

impl CartBuilder {
    pub fn new(tax_rate: TaxRate) -> Self {
        CartBuilder {
            lines: Vec::new(),
            tax_rate,
        }
    }

    /// Rebuilds a cart from existing lines, used when an order is loaded for
    /// editing. Lines with a non-positive quantity are dropped.
    pub fn from_lines(lines: Vec<CartLine>, tax_rate: TaxRate) -> Self {
        CartBuilder {
            lines: lines.into_iter().filter(|l| l.quantity > 0).collect(),
            tax_rate,
        }
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity of `product_id` already in the cart (0 if absent).
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    /// Adds one unit of `product`.
    ///
    /// ## Behavior
    /// - Existing line: quantity + 1, captured price unchanged
    /// - New line: quantity 1 at the product's current price
    /// - `on_hand − quantity already in cart ≤ 0`: no-op, returns `Ok(None)`
    ///
    /// ## Errors
    /// `CartTooLarge` when a new line would exceed [`MAX_CART_ITEMS`].
    pub fn add_line(&mut self, product: &Product, on_hand: i64) -> CoreResult<Option<LineChange>> {
        let in_cart = self.quantity_of(&product.id);
        if on_hand - in_cart <= 0 || in_cart >= MAX_ITEM_QUANTITY {
            return Ok(None);
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let previous = line.quantity;
            line.quantity += 1;
            return Ok(Some(LineChange {
                product_id: line.product_id.clone(),
                previous,
                current: line.quantity,
                affects_bottle_deposit: line.affects_bottle_deposit,
            }));
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let line = CartLine::from_product(product);
        let change = LineChange {
            product_id: line.product_id.clone(),
            previous: 0,
            current: 1,
            affects_bottle_deposit: line.affects_bottle_deposit,
        };
        self.lines.push(line);
        Ok(Some(change))
    }

    /// Sets a line's quantity, capped at `on_hand`.
    ///
    /// No-op (returns `None`) when `quantity < 1`, the product isn't in the
    /// cart, the capped quantity would be below 1, or nothing changes.
    pub fn set_line_quantity(
        &mut self,
        product_id: &str,
        quantity: i64,
        on_hand: i64,
    ) -> Option<LineChange> {
        if quantity < 1 {
            return None;
        }

        let line = self.lines.iter_mut().find(|l| l.product_id == product_id)?;
        let capped = quantity.min(on_hand).min(MAX_ITEM_QUANTITY);
        if capped < 1 || capped == line.quantity {
            return None;
        }

        let previous = line.quantity;
        line.quantity = capped;
        Some(LineChange {
            product_id: line.product_id.clone(),
            previous,
            current: capped,
            affects_bottle_deposit: line.affects_bottle_deposit,
        })
    }

    /// Deletes a line. `None` if the product wasn't in the cart.
    pub fn remove_line(&mut self, product_id: &str) -> Option<LineChange> {
        let index = self.lines.iter().position(|l| l.product_id == product_id)?;
        let line = self.lines.remove(index);
        Some(LineChange {
            product_id: line.product_id,
            previous: line.quantity,
            current: 0,
            affects_bottle_deposit: line.affects_bottle_deposit,
        })
    }

    /// Empties the cart, returning one change per removed line.
    pub fn clear(&mut self) -> Vec<LineChange> {
        self.lines
            .drain(..)
            .map(|line| LineChange {
                product_id: line.product_id,
                previous: line.quantity,
                current: 0,
                affects_bottle_deposit: line.affects_bottle_deposit,
            })
            .collect()
    }

    /// Recomputes totals. Tax is applied once to the subtotal.
    pub fn totals(&self) -> CartTotals {
        let subtotal: Money = self.lines.iter().map(CartLine::line_total).sum();
        let tax = subtotal.calculate_tax(self.tax_rate);
        CartTotals {
            item_count: self.lines.len(),
            total_quantity: self.lines.iter().map(|l| l.quantity).sum(),
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::ProductCategory;
    use chrono::Utc;

    pub(crate) fn product(id: &str, price: i64, deposit: bool) -> Product {
        Product {
            id: id.to_string(),
            code: format!("P-{}", id),
            name: format!("Product {}", id),
            description: None,
            category: ProductCategory::Water,
            price: Money::from_minor(price),
            is_active: true,
            affects_bottle_deposit: deposit,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_reference_cart_totals() {
        let a = product("A", 1000, true);
        let b = product("B", 500, false);
        let mut cart = CartBuilder::new(TaxRate::IVA);

        cart.add_line(&a, 10).unwrap();
        cart.add_line(&a, 10).unwrap();
        cart.add_line(&b, 10).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.total_quantity, 3);
        assert_eq!(totals.subtotal.minor(), 2500);
        assert_eq!(totals.tax.minor(), 475);
        assert_eq!(totals.total.minor(), 2975);
    }

    #[test]
    fn test_add_line_reports_changes() {
        let a = product("A", 1000, true);
        let mut cart = CartBuilder::default();

        let first = cart.add_line(&a, 5).unwrap().unwrap();
        assert_eq!((first.previous, first.current), (0, 1));
        assert!(first.affects_bottle_deposit);

        let second = cart.add_line(&a, 5).unwrap().unwrap();
        assert_eq!((second.previous, second.current), (1, 2));
        assert_eq!(second.delta(), 1);
    }

    #[test]
    fn test_add_line_without_stock_is_noop() {
        let a = product("A", 1000, false);
        let mut cart = CartBuilder::default();

        assert!(cart.add_line(&a, 0).unwrap().is_none());
        assert!(cart.is_empty());

        assert!(cart.add_line(&a, 1).unwrap().is_some());
        // One on hand, one already in cart
        assert!(cart.add_line(&a, 1).unwrap().is_none());
        assert_eq!(cart.quantity_of("A"), 1);
    }

    #[test]
    fn test_set_line_quantity_floor_is_noop() {
        let a = product("A", 1000, false);
        let mut cart = CartBuilder::default();
        cart.add_line(&a, 10).unwrap();

        assert!(cart.set_line_quantity("A", 0, 10).is_none());
        assert!(cart.set_line_quantity("A", -3, 10).is_none());
        assert_eq!(cart.quantity_of("A"), 1);
    }

    #[test]
    fn test_set_line_quantity_caps_at_on_hand() {
        let a = product("A", 1000, false);
        let mut cart = CartBuilder::default();
        cart.add_line(&a, 4).unwrap();

        let change = cart.set_line_quantity("A", 9, 4).unwrap();
        assert_eq!((change.previous, change.current), (1, 4));
        assert_eq!(cart.lines()[0].line_total().minor(), 4000);

        // Same value again changes nothing
        assert!(cart.set_line_quantity("A", 7, 4).is_none());
        // Unknown product
        assert!(cart.set_line_quantity("Z", 2, 10).is_none());
    }

    #[test]
    fn test_remove_line() {
        let a = product("A", 1000, true);
        let b = product("B", 500, false);
        let mut cart = CartBuilder::default();
        cart.add_line(&a, 10).unwrap();
        cart.add_line(&a, 10).unwrap();
        cart.add_line(&b, 10).unwrap();

        let change = cart.remove_line("A").unwrap();
        assert_eq!((change.previous, change.current), (2, 0));
        assert_eq!(cart.lines().len(), 1);
        assert!(cart.remove_line("A").is_none());
        assert_eq!(cart.totals().subtotal.minor(), 500);
    }

    #[test]
    fn test_price_snapshot_survives_catalog_change() {
        let mut a = product("A", 1000, false);
        let mut cart = CartBuilder::default();
        cart.add_line(&a, 10).unwrap();

        a.price = Money::from_minor(1500);
        cart.add_line(&a, 10).unwrap();

        assert_eq!(cart.lines()[0].unit_price.minor(), 1000);
        assert_eq!(cart.totals().subtotal.minor(), 2000);
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = CartBuilder::default();
        for i in 0..MAX_CART_ITEMS {
            cart.add_line(&product(&i.to_string(), 100, false), 1)
                .unwrap();
        }
        let err = cart.add_line(&product("extra", 100, false), 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_clear_reports_every_line() {
        let mut cart = CartBuilder::default();
        cart.add_line(&product("A", 100, true), 3).unwrap();
        cart.add_line(&product("B", 100, false), 3).unwrap();

        let changes = cart.clear();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.current == 0));
        assert!(cart.is_empty());
        assert_eq!(cart.totals().total, Money::zero());
    }
}
