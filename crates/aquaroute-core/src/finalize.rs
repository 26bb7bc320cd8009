//! # Order and Route Planning
//!
//! Turns a cart (plus customer and payment choice) into a plan the database
//! layer can persist in one transaction. Planning is pure: stock figures are
//! handed in by the caller and nothing is written here.
//!
//! ## Finalize Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Finalize Pipeline                                │
//! │                                                                         │
//! │  CartBuilder + Customer + PaymentMethod                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  plan_order / plan_route          (this module)                        │
//! │    ├── customer selected?         MissingCustomer                      │
//! │    ├── at least one line?         EmptyCart                            │
//! │    ├── each quantity valid?       Validation                           │
//! │    └── totals, status, payment status                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ensure_stock(lines, on_hand)     InsufficientStock before any write   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  aquaroute-db: header → items → one movement per line (cart order)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{CartBuilder, CartLine};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::BottleLedger;
use crate::money::Money;
use crate::types::{Customer, OrderStatus, PaymentMethod, PaymentStatus, SalesChannel};
use crate::validation::validate_quantity;

/// Prefix of sale numbers (`V-20250301-0007`).
pub const ORDER_NUMBER_PREFIX: &str = "V";

/// Prefix of route numbers (`R-20250301-0002`).
pub const ROUTE_NUMBER_PREFIX: &str = "R";

// =============================================================================
// Plans
// =============================================================================

/// One line to persist as an order or route item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlannedLine {
    pub product_id: String,
    pub product_code: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl From<&CartLine> for PlannedLine {
    fn from(line: &CartLine) -> Self {
        PlannedLine {
            product_id: line.product_id.clone(),
            product_code: line.code.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        }
    }
}

/// A sale ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderPlan {
    pub customer_id: String,
    pub lines: Vec<PlannedLine>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub channel: SalesChannel,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub notes: Option<String>,
}

/// Route-only inputs collected on the route form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RouteDetails {
    pub sequence: i64,
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    pub ledger: BottleLedger,
    pub observation: Option<String>,
}

/// A delivery route ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoutePlan {
    pub customer_id: String,
    pub lines: Vec<PlannedLine>,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub sequence: i64,
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    pub bottles_to_deliver: i64,
    pub bottles_to_collect: i64,
    pub bottles_in_circulation: i64,
    pub bottles_owned: i64,
    pub bottle_balance: i64,
    pub observation: Option<String>,
}

// =============================================================================
// Planning
// =============================================================================

fn planned_lines(customer: Option<&Customer>, cart: &CartBuilder) -> CoreResult<(String, Vec<PlannedLine>)> {
    let customer = customer.ok_or(CoreError::MissingCustomer)?;
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let lines: Vec<PlannedLine> = cart.lines().iter().map(PlannedLine::from).collect();
    for line in &lines {
        validate_quantity(line.quantity)?;
    }

    Ok((customer.id.clone(), lines))
}

/// Plans a confirmed sale from the cart.
///
/// Payment status is `pending` exactly when the method is `pending`.
pub fn plan_order(
    customer: Option<&Customer>,
    cart: &CartBuilder,
    payment_method: PaymentMethod,
    channel: SalesChannel,
    notes: Option<String>,
) -> CoreResult<OrderPlan> {
    let (customer_id, lines) = planned_lines(customer, cart)?;
    let totals = cart.totals();

    Ok(OrderPlan {
        customer_id,
        lines,
        status: OrderStatus::Confirmed,
        payment_status: payment_method.payment_status(),
        payment_method,
        channel,
        subtotal: totals.subtotal,
        tax: totals.tax,
        total: totals.total,
        notes,
    })
}

/// Plans a delivery route from the cart and the route form.
pub fn plan_route(
    customer: Option<&Customer>,
    cart: &CartBuilder,
    payment_method: PaymentMethod,
    details: RouteDetails,
) -> CoreResult<RoutePlan> {
    let (customer_id, lines) = planned_lines(customer, cart)?;
    if details.sequence < 1 {
        return Err(ValidationError::MustBePositive {
            field: "sequence".to_string(),
        }
        .into());
    }
    let totals = cart.totals();
    let ledger = details.ledger;

    Ok(RoutePlan {
        customer_id,
        lines,
        payment_status: payment_method.payment_status(),
        payment_method,
        subtotal: totals.subtotal,
        tax: totals.tax,
        total: totals.total,
        sequence: details.sequence,
        delivery_date: details.delivery_date,
        bottles_to_deliver: ledger.to_deliver,
        bottles_to_collect: ledger.to_collect,
        bottles_in_circulation: ledger.snapshot.in_circulation,
        bottles_owned: ledger.snapshot.owned,
        bottle_balance: ledger.balance(),
        observation: details.observation,
    })
}

/// Checks every line against on-hand stock before anything is written.
///
/// Quantities for the same product are summed first.
pub fn ensure_stock<F>(lines: &[PlannedLine], on_hand: F) -> CoreResult<()>
where
    F: Fn(&str) -> i64,
{
    let mut seen: Vec<(&str, &str, i64)> = Vec::new();
    for line in lines {
        match seen.iter_mut().find(|(id, _, _)| *id == line.product_id) {
            Some(entry) => entry.2 += line.quantity,
            None => seen.push((&line.product_id, &line.product_code, line.quantity)),
        }
    }

    for (product_id, code, requested) in seen {
        let available = on_hand(product_id);
        if requested > available {
            return Err(CoreError::InsufficientStock {
                product: code.to_string(),
                requested,
                available,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Numbering
// =============================================================================

/// Formats a daily document number, e.g. `V-20250301-0007`.
pub fn document_number(prefix: &str, date: NaiveDate, daily_sequence: i64) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), daily_sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::product;
    use crate::ledger::BottleSnapshot;
    use crate::types::{CustomerKind, TaxRate};
    use chrono::Utc;

    fn customer(lent: i64, owned: i64) -> Customer {
        Customer {
            id: "c-1".to_string(),
            code: "CLI001".to_string(),
            tax_id: None,
            name: "Juana Pérez".to_string(),
            kind: CustomerKind::Personal,
            street: "Los Aromos".to_string(),
            street_number: "123".to_string(),
            district: "Maipú".to_string(),
            city: "Santiago".to_string(),
            reference: None,
            phone: None,
            email: None,
            contact: None,
            comments: None,
            bottles_owned: owned,
            bottles_lent: lent,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn reference_cart() -> CartBuilder {
        let a = product("A", 1000, true);
        let b = product("B", 500, false);
        let mut cart = CartBuilder::new(TaxRate::IVA);
        cart.add_line(&a, 10).unwrap();
        cart.add_line(&a, 10).unwrap();
        cart.add_line(&b, 10).unwrap();
        cart
    }

    #[test]
    fn test_plan_order_reference_cart() {
        let cart = reference_cart();
        let plan = plan_order(
            Some(&customer(0, 0)),
            &cart,
            PaymentMethod::Cash,
            SalesChannel::InPerson,
            None,
        )
        .unwrap();

        assert_eq!(plan.status, OrderStatus::Confirmed);
        assert_eq!(plan.payment_status, PaymentStatus::Paid);
        assert_eq!(plan.subtotal.minor(), 2500);
        assert_eq!(plan.tax.minor(), 475);
        assert_eq!(plan.total.minor(), 2975);
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].line_total.minor(), 2000);
    }

    #[test]
    fn test_pending_method_means_pending_payment() {
        let plan = plan_order(
            Some(&customer(0, 0)),
            &reference_cart(),
            PaymentMethod::Pending,
            SalesChannel::Mobile,
            None,
        )
        .unwrap();
        assert_eq!(plan.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_missing_customer_and_empty_cart() {
        let err = plan_order(
            None,
            &reference_cart(),
            PaymentMethod::Cash,
            SalesChannel::InPerson,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingCustomer));

        let err = plan_order(
            Some(&customer(0, 0)),
            &CartBuilder::default(),
            PaymentMethod::Cash,
            SalesChannel::InPerson,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_plan_route_carries_bottle_figures() {
        let c = customer(5, 2);
        let mut ledger = BottleLedger::new(BottleSnapshot::of(&c));
        ledger.set_to_deliver(3);
        ledger.set_to_collect(2);
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let plan = plan_route(
            Some(&c),
            &reference_cart(),
            PaymentMethod::Transfer,
            RouteDetails {
                sequence: 4,
                delivery_date: date,
                ledger,
                observation: Some("Dejar en conserjería".to_string()),
            },
        )
        .unwrap();

        assert_eq!(plan.bottles_in_circulation, 5);
        assert_eq!(plan.bottles_owned, 2);
        assert_eq!(plan.bottle_balance, 6);
        assert_eq!(plan.sequence, 4);
        assert_eq!(plan.total.minor(), 2975);
    }

    #[test]
    fn test_plan_route_requires_sequence() {
        let err = plan_route(
            Some(&customer(0, 0)),
            &reference_cart(),
            PaymentMethod::Cash,
            RouteDetails {
                sequence: 0,
                delivery_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                ledger: BottleLedger::default(),
                observation: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_ensure_stock_insufficient() {
        let lines = vec![PlannedLine {
            product_id: "A".to_string(),
            product_code: "P-A".to_string(),
            quantity: 2,
            unit_price: Money::from_minor(1000),
            line_total: Money::from_minor(2000),
        }];

        let err = ensure_stock(&lines, |_| 1).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                product,
                requested,
                available,
            } => {
                assert_eq!(product, "P-A");
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(ensure_stock(&lines, |_| 2).is_ok());
    }

    #[test]
    fn test_document_number() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            document_number(ORDER_NUMBER_PREFIX, date, 7),
            "V-20250301-0007"
        );
        assert_eq!(
            document_number(ROUTE_NUMBER_PREFIX, date, 12),
            "R-20250301-0012"
        );
    }
}
