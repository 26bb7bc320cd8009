//! # Read Models
//!
//! Pure aggregations behind the dashboard and report screens. The database
//! layer loads the rows; the arithmetic lives here so it can be tested
//! without a store.
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ Report                   │ Input rows                                   │
//! ├──────────────────────────┼──────────────────────────────────────────────┤
//! │ sales_by_period          │ orders (confirmed only)                      │
//! │ top_products             │ SoldLine (order items + product name)        │
//! │ top_customers            │ CustomerSale (order totals + customer name)  │
//! │ delivery_metrics         │ delivery routes                              │
//! │ financial_summary        │ orders + expenses                            │
//! │ low_stock                │ inventory items + alerts                     │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{
    DeliveryRoute, DeliveryStatus, Expense, InventoryAlert, InventoryItem, Order, OrderStatus,
    PaymentStatus,
};

/// Rows shown by the "top" reports.
pub const TOP_LIMIT: usize = 10;

// =============================================================================
// Sales by Period
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Period::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodSales {
    #[ts(as = "String")]
    pub period_start: NaiveDate,
    pub order_count: i64,
    pub total: Money,
}

/// Total and count of confirmed orders per bucket, oldest first.
pub fn sales_by_period(orders: &[Order], period: Period) -> Vec<PeriodSales> {
    let mut buckets: BTreeMap<NaiveDate, (i64, Money)> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.status == OrderStatus::Confirmed) {
        let start = period.bucket_start(order.created_at.date_naive());
        let entry = buckets.entry(start).or_insert((0, Money::zero()));
        entry.0 += 1;
        entry.1 += order.total;
    }

    buckets
        .into_iter()
        .map(|(period_start, (order_count, total))| PeriodSales {
            period_start,
            order_count,
            total,
        })
        .collect()
}

// =============================================================================
// Top Products / Customers
// =============================================================================

/// One sold line joined with its product name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SoldLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRanking {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub amount: Money,
}

/// Products ranked by amount sold, highest first.
pub fn top_products(lines: &[SoldLine], limit: usize) -> Vec<ProductRanking> {
    let mut by_product: BTreeMap<&str, ProductRanking> = BTreeMap::new();
    for line in lines {
        let entry = by_product
            .entry(&line.product_id)
            .or_insert_with(|| ProductRanking {
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: 0,
                amount: Money::zero(),
            });
        entry.quantity += line.quantity;
        entry.amount += line.line_total;
    }

    let mut ranked: Vec<ProductRanking> = by_product.into_values().collect();
    ranked.sort_by(|a, b| b.amount.cmp(&a.amount).then(b.quantity.cmp(&a.quantity)));
    ranked.truncate(limit);
    ranked
}

/// One order total joined with its customer name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerSale {
    pub customer_id: String,
    pub customer_name: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRanking {
    pub customer_id: String,
    pub customer_name: String,
    pub order_count: i64,
    pub amount: Money,
}

/// Customers ranked by amount bought, highest first.
pub fn top_customers(sales: &[CustomerSale], limit: usize) -> Vec<CustomerRanking> {
    let mut by_customer: BTreeMap<&str, CustomerRanking> = BTreeMap::new();
    for sale in sales {
        let entry = by_customer
            .entry(&sale.customer_id)
            .or_insert_with(|| CustomerRanking {
                customer_id: sale.customer_id.clone(),
                customer_name: sale.customer_name.clone(),
                order_count: 0,
                amount: Money::zero(),
            });
        entry.order_count += 1;
        entry.amount += sale.total;
    }

    let mut ranked: Vec<CustomerRanking> = by_customer.into_values().collect();
    ranked.sort_by(|a, b| b.amount.cmp(&a.amount).then(b.order_count.cmp(&a.order_count)));
    ranked.truncate(limit);
    ranked
}

// =============================================================================
// Delivery Metrics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryMetrics {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub cancelled: i64,
    /// Completed over total, in percent. 0 when there are no routes.
    pub completion_rate: f64,
}

pub fn delivery_metrics(routes: &[DeliveryRoute]) -> DeliveryMetrics {
    let count = |status: DeliveryStatus| {
        routes
            .iter()
            .filter(|r| r.delivery_status == status)
            .count() as i64
    };

    let total = routes.len() as i64;
    let completed = count(DeliveryStatus::Completed);
    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 * 100.0 / total as f64
    };

    DeliveryMetrics {
        total,
        completed,
        pending: count(DeliveryStatus::Pending),
        cancelled: count(DeliveryStatus::Cancelled),
        completion_rate,
    }
}

// =============================================================================
// Financial Summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialSummary {
    pub income: Money,
    pub expenses: Money,
    pub net_income: Money,
    pub expenses_by_category: Vec<CategoryAmount>,
}

/// Income counts paid orders that were not cancelled.
pub fn financial_summary(orders: &[Order], expenses: &[Expense]) -> FinancialSummary {
    let income: Money = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled && o.payment_status == PaymentStatus::Paid)
        .map(|o| o.total)
        .sum();

    let mut by_category: BTreeMap<&str, Money> = BTreeMap::new();
    for expense in expenses {
        *by_category
            .entry(expense.category.as_str())
            .or_insert(Money::zero()) += expense.amount;
    }
    let total_expenses: Money = by_category.values().sum();

    let mut expenses_by_category: Vec<CategoryAmount> = by_category
        .into_iter()
        .map(|(category, amount)| CategoryAmount {
            category: category.to_string(),
            amount,
        })
        .collect();
    expenses_by_category.sort_by(|a, b| b.amount.cmp(&a.amount));

    FinancialSummary {
        income,
        expenses: total_expenses,
        net_income: income - total_expenses,
        expenses_by_category,
    }
}

// =============================================================================
// Low Stock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStockAlert {
    pub product_id: String,
    pub quantity: i64,
    pub min_quantity: i64,
    pub alert_quantity: i64,
}

/// Products whose total on-hand quantity is at or below an enabled alert's
/// minimum. Products without inventory rows count as zero.
pub fn low_stock(items: &[InventoryItem], alerts: &[InventoryAlert]) -> Vec<LowStockAlert> {
    let mut on_hand: BTreeMap<&str, i64> = BTreeMap::new();
    for item in items {
        *on_hand.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
    }

    alerts
        .iter()
        .filter(|a| a.enabled)
        .filter_map(|alert| {
            let quantity = on_hand.get(alert.product_id.as_str()).copied().unwrap_or(0);
            (quantity <= alert.min_quantity).then(|| LowStockAlert {
                product_id: alert.product_id.clone(),
                quantity,
                min_quantity: alert.min_quantity,
                alert_quantity: alert.alert_quantity,
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        InventoryLocation, InventoryStatus, ItemCondition, PaymentMethod, SalesChannel,
    };
    use chrono::{TimeZone, Utc};

    fn order(day: u32, total: i64, status: OrderStatus, paid: bool) -> Order {
        let at = Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap();
        Order {
            id: format!("o-{day}-{total}"),
            order_number: "V-20250301-0001".to_string(),
            customer_id: "c-1".to_string(),
            status,
            payment_status: if paid {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Pending
            },
            payment_method: if paid {
                PaymentMethod::Cash
            } else {
                PaymentMethod::Pending
            },
            channel: SalesChannel::InPerson,
            subtotal: Money::from_minor(total),
            tax: Money::zero(),
            total: Money::from_minor(total),
            notes: None,
            created_by: "u-1".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_period_buckets() {
        // 2025-03-05 is a Wednesday
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(Period::Day.bucket_start(date), date);
        assert_eq!(
            Period::Week.bucket_start(date),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
        assert_eq!(
            Period::Month.bucket_start(date),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_sales_by_period_skips_unconfirmed() {
        let orders = vec![
            order(3, 1000, OrderStatus::Confirmed, true),
            order(4, 2000, OrderStatus::Confirmed, false),
            order(4, 9999, OrderStatus::Cancelled, true),
            order(11, 500, OrderStatus::Confirmed, true),
        ];

        let weekly = sales_by_period(&orders, Period::Week);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].order_count, 2);
        assert_eq!(weekly[0].total.minor(), 3000);
        assert_eq!(weekly[1].total.minor(), 500);
    }

    #[test]
    fn test_top_products_ranked_by_amount() {
        let line = |id: &str, qty: i64, total: i64| SoldLine {
            product_id: id.to_string(),
            product_name: format!("Product {id}"),
            quantity: qty,
            line_total: Money::from_minor(total),
        };
        let lines = vec![line("A", 2, 2000), line("B", 10, 5000), line("A", 1, 1000)];

        let top = top_products(&lines, TOP_LIMIT);
        assert_eq!(top[0].product_id, "B");
        assert_eq!(top[1].quantity, 3);
        assert_eq!(top[1].amount.minor(), 3000);

        assert_eq!(top_products(&lines, 1).len(), 1);
    }

    #[test]
    fn test_top_customers_counts_orders() {
        let sale = |id: &str, total: i64| CustomerSale {
            customer_id: id.to_string(),
            customer_name: id.to_uppercase(),
            total: Money::from_minor(total),
        };
        let top = top_customers(&[sale("x", 100), sale("y", 700), sale("x", 300)], TOP_LIMIT);
        assert_eq!(top[0].customer_id, "y");
        assert_eq!(top[1].order_count, 2);
        assert_eq!(top[1].amount.minor(), 400);
    }

    #[test]
    fn test_delivery_metrics_empty_and_mixed() {
        assert_eq!(delivery_metrics(&[]).completion_rate, 0.0);

        let route = |status: DeliveryStatus| DeliveryRoute {
            id: "r".to_string(),
            route_number: "R-20250301-0001".to_string(),
            customer_id: "c-1".to_string(),
            sequence: 1,
            delivery_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            payment_status: PaymentStatus::Paid,
            payment_method: PaymentMethod::Cash,
            subtotal: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
            bottles_to_deliver: 0,
            bottles_to_collect: 0,
            bottles_in_circulation: 0,
            bottles_owned: 0,
            bottle_balance: 0,
            observation: None,
            delivery_status: status,
            created_by: "u-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let routes = vec![
            route(DeliveryStatus::Completed),
            route(DeliveryStatus::Completed),
            route(DeliveryStatus::Completed),
            route(DeliveryStatus::Pending),
        ];

        let metrics = delivery_metrics(&routes);
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.completed, 3);
        assert_eq!(metrics.pending, 1);
        assert_eq!(metrics.cancelled, 0);
        assert_eq!(metrics.completion_rate, 75.0);
    }

    #[test]
    fn test_financial_summary() {
        let orders = vec![
            order(1, 10000, OrderStatus::Confirmed, true),
            order(2, 5000, OrderStatus::Confirmed, false),
            order(3, 7000, OrderStatus::Cancelled, true),
        ];
        let expense = |category: &str, amount: i64| Expense {
            id: category.to_string(),
            category: category.to_string(),
            amount: Money::from_minor(amount),
            description: None,
            expense_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            created_by: "u-1".to_string(),
            created_at: Utc::now(),
        };
        let expenses = vec![expense("fuel", 1500), expense("salaries", 4000), expense("fuel", 500)];

        let summary = financial_summary(&orders, &expenses);
        assert_eq!(summary.income.minor(), 10000);
        assert_eq!(summary.expenses.minor(), 6000);
        assert_eq!(summary.net_income.minor(), 4000);
        assert_eq!(summary.expenses_by_category[0].category, "salaries");
        assert_eq!(summary.expenses_by_category[1].amount.minor(), 2000);
    }

    #[test]
    fn test_low_stock() {
        let item = |product: &str, qty: i64| InventoryItem {
            id: format!("i-{product}"),
            product_id: product.to_string(),
            quantity: qty,
            location: InventoryLocation::Warehouse,
            status: InventoryStatus::Available,
            condition: ItemCondition::New,
            last_count_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let alert = |product: &str, min: i64, enabled: bool| InventoryAlert {
            id: format!("a-{product}"),
            product_id: product.to_string(),
            min_quantity: min,
            alert_quantity: min * 2,
            enabled,
            created_at: Utc::now(),
        };

        let items = vec![item("A", 3), item("B", 50)];
        let alerts = vec![alert("A", 5, true), alert("B", 10, true), alert("C", 1, true), alert("D", 9, false)];

        let low = low_stock(&items, &alerts);
        let ids: Vec<&str> = low.iter().map(|a| a.product_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(low[1].quantity, 0);
    }
}
