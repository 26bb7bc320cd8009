//! # Report Repository
//!
//! Loads the rows behind each read model and hands them to
//! [`aquaroute_core::reports`] for aggregation.
//!
//! Order-based reports filter on the order's creation date; route metrics on
//! the delivery date; expenses on the expense date. Ranges are inclusive.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::expense::ExpenseRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::route::RouteRepository;
use aquaroute_core::reports::{
    self, CustomerRanking, CustomerSale, DeliveryMetrics, FinancialSummary, LowStockAlert,
    PeriodSales, Period, ProductRanking, SoldLine,
};
use aquaroute_core::Order;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    async fn orders_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, customer_id, status, payment_status, payment_method,
                   channel, subtotal, tax, total, notes, created_by, created_at, updated_at
            FROM orders
            WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2
            ORDER BY created_at
            "#,
        )
        .bind(day(from))
        .bind(day(to))
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Confirmed sales per day, week or month.
    pub async fn sales_by_period(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        period: Period,
    ) -> DbResult<Vec<PeriodSales>> {
        debug!(from = %from, to = %to, period = ?period, "Sales by period");
        let orders = self.orders_between(from, to).await?;
        Ok(reports::sales_by_period(&orders, period))
    }

    /// Best-selling products by amount, from non-cancelled orders.
    pub async fn top_products(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> DbResult<Vec<ProductRanking>> {
        let lines = sqlx::query_as::<_, SoldLine>(
            r#"
            SELECT
                oi.product_id,
                p.name AS product_name,
                oi.quantity,
                oi.line_total
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.status != 'cancelled'
              AND substr(o.created_at, 1, 10) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(day(from))
        .bind(day(to))
        .fetch_all(&self.pool)
        .await?;

        debug!(lines = lines.len(), "Top products");
        Ok(reports::top_products(&lines, limit))
    }

    /// Best customers by amount, from non-cancelled orders.
    pub async fn top_customers(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> DbResult<Vec<CustomerRanking>> {
        let sales = sqlx::query_as::<_, CustomerSale>(
            r#"
            SELECT
                o.customer_id,
                c.name AS customer_name,
                o.total
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE o.status != 'cancelled'
              AND substr(o.created_at, 1, 10) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(day(from))
        .bind(day(to))
        .fetch_all(&self.pool)
        .await?;

        debug!(orders = sales.len(), "Top customers");
        Ok(reports::top_customers(&sales, limit))
    }

    pub async fn delivery_metrics(&self, from: NaiveDate, to: NaiveDate) -> DbResult<DeliveryMetrics> {
        let routes = RouteRepository::new(self.pool.clone())
            .list_between(from, to)
            .await?;
        Ok(reports::delivery_metrics(&routes))
    }

    /// Income from paid orders against recorded expenses.
    pub async fn financial_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<FinancialSummary> {
        let orders = self.orders_between(from, to).await?;
        let expenses = ExpenseRepository::new(self.pool.clone())
            .list_between(from, to)
            .await?;
        Ok(reports::financial_summary(&orders, &expenses))
    }

    pub async fn low_stock(&self) -> DbResult<Vec<LowStockAlert>> {
        let inventory = InventoryRepository::new(self.pool.clone());
        let items = inventory.list_items().await?;
        let alerts = inventory.list_alerts().await?;
        Ok(reports::low_stock(&items, &alerts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::expense::NewExpense;
    use crate::repository::test_support::{seed_customer, seed_product, stock, test_db};
    use crate::repository::today;
    use aquaroute_core::finalize::plan_order;
    use aquaroute_core::reports::TOP_LIMIT;
    use aquaroute_core::{CartBuilder, Money, PaymentMethod, SalesChannel, TaxRate};

    #[tokio::test]
    async fn test_sales_rankings_and_summary() {
        let db = test_db().await;
        let customer = seed_customer(&db, 0, 0).await;
        let refill = seed_product(&db, "BID-20L", 1000, true).await;
        let cup = seed_product(&db, "VASO-01", 500, false).await;
        stock(&db, &refill.id, 10).await;
        stock(&db, &cup.id, 10).await;

        let mut cart = CartBuilder::new(TaxRate::IVA);
        cart.add_line(&refill, 10).unwrap();
        cart.add_line(&refill, 10).unwrap();
        cart.add_line(&cup, 10).unwrap();
        let paid = plan_order(Some(&customer), &cart, PaymentMethod::Cash, SalesChannel::InPerson, None)
            .unwrap();
        let pending =
            plan_order(Some(&customer), &cart, PaymentMethod::Pending, SalesChannel::Mobile, None)
                .unwrap();
        db.orders().finalize(&paid, "u-1").await.unwrap();
        db.orders().finalize(&pending, "u-1").await.unwrap();
        let cancelled = db.orders().finalize(&paid, "u-1").await.unwrap();
        db.orders().cancel(&cancelled.order.id, "u-1").await.unwrap();

        db.expenses()
            .record(
                NewExpense {
                    category: "fuel".to_string(),
                    amount: Money::from_minor(1000),
                    description: None,
                    expense_date: today(),
                },
                "u-1",
            )
            .await
            .unwrap();

        let reports = db.reports();
        let (from, to) = (today(), today());

        let sales = reports.sales_by_period(from, to, Period::Day).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].order_count, 2);
        assert_eq!(sales[0].total.minor(), 5950);

        let products = reports.top_products(from, to, TOP_LIMIT).await.unwrap();
        assert_eq!(products[0].product_id, refill.id);
        assert_eq!(products[0].quantity, 4);
        assert_eq!(products[0].amount.minor(), 4000);

        let customers = reports.top_customers(from, to, TOP_LIMIT).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].order_count, 2);

        let summary = reports.financial_summary(from, to).await.unwrap();
        assert_eq!(summary.income.minor(), 2975);
        assert_eq!(summary.expenses.minor(), 1000);
        assert_eq!(summary.net_income.minor(), 1975);
    }

    #[tokio::test]
    async fn test_low_stock_and_empty_metrics() {
        let db = test_db().await;
        let refill = seed_product(&db, "BID-20L", 1000, true).await;
        let cup = seed_product(&db, "VASO-01", 500, false).await;
        stock(&db, &refill.id, 3).await;
        stock(&db, &cup.id, 50).await;
        db.inventory().upsert_alert(&refill.id, 5, 20, true).await.unwrap();
        db.inventory().upsert_alert(&cup.id, 5, 20, true).await.unwrap();

        let low = db.reports().low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, refill.id);
        assert_eq!(low[0].quantity, 3);

        let metrics = db.reports().delivery_metrics(today(), today()).await.unwrap();
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.completion_rate, 0.0);
    }
}
