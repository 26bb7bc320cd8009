//! # Bottle-Deposit Ledger
//!
//! Tracks returnable 20 L bottles for the customer on a delivery route.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Bottle-Deposit Ledger                               │
//! │                                                                         │
//! │   Customer ──snapshot──► { in_circulation (= bottles_lent), owned }    │
//! │                                                                         │
//! │   Cart LineChange (deposit-bearing only)                                │
//! │     └── to_deliver += current − previous   (floored at 0)              │
//! │                                                                         │
//! │   Driver input                                                          │
//! │     ├── set_to_collect(n)                                              │
//! │     └── set_to_deliver(n)   (manual override)                          │
//! │                                                                         │
//! │   balance = in_circulation + to_deliver − to_collect                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The balance is informational only. It is stored with the route and never
//! blocks finalization. The snapshot is taken once when the route is created;
//! later changes to the customer don't touch it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::LineChange;
use crate::types::Customer;

/// Customer bottle counters captured when the route is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BottleSnapshot {
    /// Company bottles currently held by the customer.
    pub in_circulation: i64,
    /// Bottles the customer owns outright.
    pub owned: i64,
}

impl BottleSnapshot {
    pub fn of(customer: &Customer) -> Self {
        BottleSnapshot {
            in_circulation: customer.bottles_lent,
            owned: customer.bottles_owned,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BottleLedger {
    pub snapshot: BottleSnapshot,
    pub to_deliver: i64,
    pub to_collect: i64,
}

impl BottleLedger {
    pub fn new(snapshot: BottleSnapshot) -> Self {
        BottleLedger {
            snapshot,
            to_deliver: 0,
            to_collect: 0,
        }
    }

    /// Follows a cart mutation. Lines that don't carry a deposit are ignored.
    pub fn record_line_change(&mut self, change: &LineChange) {
        if !change.affects_bottle_deposit {
            return;
        }
        self.to_deliver = (self.to_deliver + change.delta()).max(0);
    }

    /// Replays a batch of cart mutations in order.
    pub fn record_all<'a>(&mut self, changes: impl IntoIterator<Item = &'a LineChange>) {
        for change in changes {
            self.record_line_change(change);
        }
    }

    /// Bottles the driver expects to pick up. Negative input is clamped to 0.
    pub fn set_to_collect(&mut self, bottles: i64) {
        self.to_collect = bottles.max(0);
    }

    /// Overrides the derived delivery count. Negative input is clamped to 0.
    pub fn set_to_deliver(&mut self, bottles: i64) {
        self.to_deliver = bottles.max(0);
    }

    pub fn balance(&self) -> i64 {
        self.snapshot.in_circulation + self.to_deliver - self.to_collect
    }

    /// Net change to the customer's live `bottles_lent` once the route is
    /// completed.
    pub fn net_lent_change(&self) -> i64 {
        self.to_deliver - self.to_collect
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::product;
    use crate::cart::CartBuilder;

    fn change(previous: i64, current: i64, deposit: bool) -> LineChange {
        LineChange {
            product_id: "p".to_string(),
            previous,
            current,
            affects_bottle_deposit: deposit,
        }
    }

    #[test]
    fn test_balance_reference_example() {
        let mut ledger = BottleLedger::new(BottleSnapshot {
            in_circulation: 5,
            owned: 2,
        });
        ledger.set_to_deliver(3);
        ledger.set_to_collect(2);
        assert_eq!(ledger.balance(), 6);
        assert_eq!(ledger.net_lent_change(), 1);
    }

    #[test]
    fn test_deposit_lines_drive_to_deliver() {
        let mut ledger = BottleLedger::default();
        ledger.record_line_change(&change(0, 1, true));
        ledger.record_line_change(&change(1, 4, true));
        assert_eq!(ledger.to_deliver, 4);

        ledger.record_line_change(&change(4, 2, true));
        assert_eq!(ledger.to_deliver, 2);
    }

    #[test]
    fn test_non_deposit_lines_ignored() {
        let mut ledger = BottleLedger::default();
        ledger.record_line_change(&change(0, 5, false));
        assert_eq!(ledger.to_deliver, 0);
    }

    #[test]
    fn test_removal_floors_at_zero() {
        let mut ledger = BottleLedger::default();
        ledger.record_line_change(&change(0, 2, true));
        // Driver lowered the count by hand before the line was removed
        ledger.set_to_deliver(1);
        ledger.record_line_change(&change(2, 0, true));
        assert_eq!(ledger.to_deliver, 0);
    }

    #[test]
    fn test_follows_cart_builder() {
        let refill = product("R", 2500, true);
        let dispenser = product("D", 9000, false);
        let mut cart = CartBuilder::default();
        let mut ledger = BottleLedger::default();

        for _ in 0..3 {
            if let Some(c) = cart.add_line(&refill, 10).unwrap() {
                ledger.record_line_change(&c);
            }
        }
        if let Some(c) = cart.add_line(&dispenser, 10).unwrap() {
            ledger.record_line_change(&c);
        }
        assert_eq!(ledger.to_deliver, 3);

        let c = cart.set_line_quantity("R", 1, 10).unwrap();
        ledger.record_line_change(&c);
        assert_eq!(ledger.to_deliver, 1);

        ledger.record_all(cart.clear().iter());
        assert_eq!(ledger.to_deliver, 0);
    }

    #[test]
    fn test_negative_input_clamped() {
        let mut ledger = BottleLedger::default();
        ledger.set_to_collect(-4);
        ledger.set_to_deliver(-1);
        assert_eq!((ledger.to_deliver, ledger.to_collect), (0, 0));
    }
}
