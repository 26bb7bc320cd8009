//! # Order Repository
//!
//! The sales finalizer: persists a planned order, its items and one
//! inventory movement per line as a single transaction.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. FINALIZE  finalize(plan, actor)                                    │
//! │     ├── check stock for every line      → InsufficientStock            │
//! │     ├── insert header  V-YYYYMMDD-NNNN  status: confirmed              │
//! │     ├── insert items   (cart order, unit price snapshot)               │
//! │     └── movements      out, −quantity, reason: order                   │
//! │                                                                         │
//! │  2. (OPTIONAL) EDIT  edit(id, plan, actor)                             │
//! │     ├── return movements for the old lines  reason: order_edit         │
//! │     ├── check stock for the new lines                                  │
//! │     ├── delete old items, insert new items                             │
//! │     ├── out movements for the new lines     reason: order_edit         │
//! │     └── header totals + updated_at                                     │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL  cancel(id, actor)                               │
//! │     ├── return movements for every line     reason: order_cancel       │
//! │     └── status: cancelled                                              │
//! │                                                                         │
//! │  Any failure rolls back the whole call. Store failures name the step.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{apply_movement_in, check_stock, NewMovement};
use crate::repository::{begin_write, next_daily_sequence, today};
use aquaroute_core::finalize::{document_number, ORDER_NUMBER_PREFIX};
use aquaroute_core::{
    CoreError, MovementReason, Order, OrderItem, OrderPlan, OrderStatus, OrderWithItems,
    PaymentMethod, PlannedLine,
};

const COLUMNS: &str = "id, order_number, customer_id, status, payment_status, payment_method, \
                       channel, subtotal, tax, total, notes, created_by, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price, line_total, created_at";

/// Filter for [`OrderRepository::find`]. Empty fields don't filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<String>,
    pub status: Option<OrderStatus>,
    /// Inclusive, on the creation date.
    pub from: Option<NaiveDate>,
    /// Inclusive, on the creation date.
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

/// Repository for orders and order items.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn load_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
    let sql = format!("SELECT {COLUMNS} FROM orders WHERE id = ?1");
    sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))
}

async fn load_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

async fn insert_items(
    conn: &mut SqliteConnection,
    order_id: &str,
    lines: &[PlannedLine],
    now: DateTime<Utc>,
) -> DbResult<Vec<OrderItem>> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, quantity, unit_price, line_total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        items.push(item);
    }
    Ok(items)
}

async fn take_stock(
    conn: &mut SqliteConnection,
    lines: &[PlannedLine],
    reason: MovementReason,
    order_id: &str,
    actor_id: &str,
) -> DbResult<()> {
    for line in lines {
        let movement = NewMovement::outgoing(&line.product_id, line.quantity, reason, order_id, actor_id);
        apply_movement_in(conn, &movement).await?;
    }
    Ok(())
}

async fn return_stock(
    conn: &mut SqliteConnection,
    items: &[OrderItem],
    reason: MovementReason,
    order_id: &str,
    actor_id: &str,
) -> DbResult<()> {
    for item in items {
        let movement = NewMovement::returning(&item.product_id, item.quantity, reason, order_id, actor_id);
        apply_movement_in(conn, &movement).await?;
    }
    Ok(())
}

fn ensure_confirmed(order: &Order, operation: &str) -> DbResult<()> {
    if order.status != OrderStatus::Confirmed {
        return Err(CoreError::InvalidStatus {
            entity: "Order".to_string(),
            id: order.order_number.clone(),
            status: format!("{:?}", order.status).to_lowercase(),
            operation: operation.to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a planned sale.
    ///
    /// ## Returns
    /// * `Ok(OrderWithItems)` - the stored order; the caller clears its cart
    /// * `Err(Core(InsufficientStock))` - nothing was written
    /// * `Err(Step { .. })` - store failure, rolled back, step named
    pub async fn finalize(&self, plan: &OrderPlan, actor_id: &str) -> DbResult<OrderWithItems> {
        if plan.lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let mut tx = begin_write(&self.pool).await?;

        check_stock(&mut tx, &plan.lines)
            .await
            .map_err(|e| DbError::at("check stock", e))?;

        let now = Utc::now();
        let date = today();
        let sequence = next_daily_sequence(&mut tx, "orders", "order_number", ORDER_NUMBER_PREFIX, date)
            .await
            .map_err(|e| DbError::at("number order", e))?;

        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: document_number(ORDER_NUMBER_PREFIX, date, sequence),
            customer_id: plan.customer_id.clone(),
            status: plan.status,
            payment_status: plan.payment_status,
            payment_method: plan.payment_method,
            channel: plan.channel,
            subtotal: plan.subtotal,
            tax: plan.tax,
            total: plan.total,
            notes: plan.notes.clone(),
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(order_number = %order.order_number, lines = plan.lines.len(), "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, status, payment_status, payment_method,
                channel, subtotal, tax, total, notes, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.customer_id)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(order.channel)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.total)
        .bind(&order.notes)
        .bind(&order.created_by)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::at("insert order header", e))?;

        let items = insert_items(&mut tx, &order.id, &plan.lines, now)
            .await
            .map_err(|e| DbError::at("insert order items", e))?;

        take_stock(&mut tx, &plan.lines, MovementReason::Order, &order.id, actor_id)
            .await
            .map_err(|e| DbError::at("apply inventory movements", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(
            order_number = %order.order_number,
            customer_id = %order.customer_id,
            total = %order.total,
            items = items.len(),
            actor = %actor_id,
            "Order finalized"
        );

        Ok(OrderWithItems { order, items })
    }

    /// Replaces a confirmed order's lines with a new plan.
    ///
    /// The prior lines are returned to stock before the new ones are checked,
    /// so keeping a line at the same quantity never fails for lack of stock.
    pub async fn edit(
        &self,
        order_id: &str,
        plan: &OrderPlan,
        actor_id: &str,
    ) -> DbResult<OrderWithItems> {
        if plan.lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let mut tx = begin_write(&self.pool).await?;

        let order = load_order(&mut tx, order_id).await?;
        ensure_confirmed(&order, "edit")?;
        let prior = load_items(&mut tx, order_id)
            .await
            .map_err(|e| DbError::at("load order items", e))?;

        return_stock(&mut tx, &prior, MovementReason::OrderEdit, order_id, actor_id)
            .await
            .map_err(|e| DbError::at("reverse prior movements", e))?;

        check_stock(&mut tx, &plan.lines)
            .await
            .map_err(|e| DbError::at("check stock", e))?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::at("delete order items", e))?;

        let now = Utc::now();
        let items = insert_items(&mut tx, order_id, &plan.lines, now)
            .await
            .map_err(|e| DbError::at("insert order items", e))?;

        take_stock(&mut tx, &plan.lines, MovementReason::OrderEdit, order_id, actor_id)
            .await
            .map_err(|e| DbError::at("apply inventory movements", e))?;

        let sql = format!(
            r#"
            UPDATE orders SET
                customer_id = ?2, payment_status = ?3, payment_method = ?4, channel = ?5,
                subtotal = ?6, tax = ?7, total = ?8, notes = ?9, updated_at = ?10
            WHERE id = ?1
            RETURNING {COLUMNS}
            "#
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .bind(&plan.customer_id)
            .bind(plan.payment_status)
            .bind(plan.payment_method)
            .bind(plan.channel)
            .bind(plan.subtotal)
            .bind(plan.tax)
            .bind(plan.total)
            .bind(&plan.notes)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::at("update order header", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(
            order_number = %order.order_number,
            total = %order.total,
            replaced = prior.len(),
            items = items.len(),
            actor = %actor_id,
            "Order edited"
        );

        Ok(OrderWithItems { order, items })
    }

    /// Cancels a confirmed order and restores its stock.
    pub async fn cancel(&self, order_id: &str, actor_id: &str) -> DbResult<Order> {
        let mut tx = begin_write(&self.pool).await?;

        let order = load_order(&mut tx, order_id).await?;
        ensure_confirmed(&order, "cancel")?;
        let items = load_items(&mut tx, order_id)
            .await
            .map_err(|e| DbError::at("load order items", e))?;

        return_stock(&mut tx, &items, MovementReason::OrderCancel, order_id, actor_id)
            .await
            .map_err(|e| DbError::at("restore inventory", e))?;

        let sql = format!(
            "UPDATE orders SET status = 'cancelled', updated_at = ?2 WHERE id = ?1 RETURNING {COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::at("update order status", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(order_number = %order.order_number, actor = %actor_id, "Order cancelled");
        Ok(order)
    }

    /// Records how a pending order was paid.
    pub async fn set_payment(&self, order_id: &str, method: PaymentMethod) -> DbResult<Order> {
        debug!(order_id = %order_id, method = ?method, "Updating payment");

        let sql = format!(
            r#"
            UPDATE orders SET payment_method = ?2, payment_status = ?3, updated_at = ?4
            WHERE id = ?1 AND status != 'cancelled'
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .bind(method)
            .bind(method.payment_status())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Order (not cancelled)", order_id))
    }

    /// An order with its items.
    pub async fn get(&self, id: &str) -> DbResult<OrderWithItems> {
        let mut conn = self.pool.acquire().await?;
        let order = load_order(&mut conn, id).await?;
        let items = load_items(&mut conn, id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Orders matching `filter`, newest first.
    pub async fn find(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM orders WHERE 1 = 1"));

        if let Some(customer_id) = &filter.customer_id {
            query.push(" AND customer_id = ").push_bind(customer_id.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.from {
            query
                .push(" AND substr(created_at, 1, 10) >= ")
                .push_bind(from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.to {
            query
                .push(" AND substr(created_at, 1, 10) <= ")
                .push_bind(to.format("%Y-%m-%d").to_string());
        }
        query.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let orders = query
            .build_query_as::<Order>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = orders.len(), "Orders found");
        Ok(orders)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{file_db, seed_customer, seed_product, stock, test_db};
    use crate::Database;
    use aquaroute_core::finalize::plan_order;
    use aquaroute_core::{CartBuilder, Customer, MovementKind, PaymentStatus, Product, SalesChannel, TaxRate};

    struct Fixture {
        db: Database,
        customer: Customer,
        a: Product,
        b: Product,
    }

    async fn fixture(stock_a: i64, stock_b: i64) -> Fixture {
        let db = test_db().await;
        let customer = seed_customer(&db, 0, 0).await;
        let a = seed_product(&db, "BID-20L", 1000, true).await;
        let b = seed_product(&db, "VASO-01", 500, false).await;
        if stock_a > 0 {
            stock(&db, &a.id, stock_a).await;
        }
        if stock_b > 0 {
            stock(&db, &b.id, stock_b).await;
        }
        Fixture { db, customer, a, b }
    }

    fn cart(lines: &[(&Product, i64)]) -> CartBuilder {
        let mut cart = CartBuilder::new(TaxRate::IVA);
        for (product, quantity) in lines {
            cart.add_line(product, 1_000).unwrap();
            cart.set_line_quantity(&product.id, *quantity, 1_000);
        }
        cart
    }

    fn plan(f: &Fixture, cart: &CartBuilder, method: PaymentMethod) -> OrderPlan {
        plan_order(Some(&f.customer), cart, method, SalesChannel::InPerson, None).unwrap()
    }

    #[tokio::test]
    async fn test_finalize_reference_cart() {
        let f = fixture(10, 10).await;
        let plan = plan(&f, &cart(&[(&f.a, 2), (&f.b, 1)]), PaymentMethod::Cash);

        let saved = f.db.orders().finalize(&plan, "u-seller").await.unwrap();

        assert_eq!(saved.order.subtotal.minor(), 2500);
        assert_eq!(saved.order.tax.minor(), 475);
        assert_eq!(saved.order.total.minor(), 2975);
        assert_eq!(saved.order.status, OrderStatus::Confirmed);
        assert_eq!(saved.order.payment_status, PaymentStatus::Paid);
        assert!(saved.order.order_number.starts_with("V-"));
        assert_eq!(saved.items.len(), 2);

        let movements = f.db.inventory().movements_for_ref(&saved.order.id).await.unwrap();
        let deltas: Vec<i64> = movements.iter().map(|m| m.delta).collect();
        assert_eq!(deltas, vec![-2, -1]);
        assert!(movements.iter().all(|m| m.reason == MovementReason::Order));

        assert_eq!(f.db.inventory().on_hand(&f.a.id).await.unwrap(), 8);
        assert_eq!(f.db.inventory().on_hand(&f.b.id).await.unwrap(), 9);

        let loaded = f.db.orders().get(&saved.order.id).await.unwrap();
        assert_eq!(loaded.items[0].unit_price.minor(), 1000);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let f = fixture(1, 10).await;
        let plan = plan(&f, &cart(&[(&f.b, 1), (&f.a, 2)]), PaymentMethod::Cash);

        let err = f.db.orders().finalize(&plan, "u-seller").await.unwrap_err();
        match err {
            DbError::Core(CoreError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(f.db.orders().find(&OrderFilter::default()).await.unwrap().is_empty());
        assert_eq!(f.db.inventory().on_hand(&f.a.id).await.unwrap(), 1);
        assert_eq!(f.db.inventory().on_hand(&f.b.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_pending_payment_and_settlement() {
        let f = fixture(5, 0).await;
        let plan = plan(&f, &cart(&[(&f.a, 1)]), PaymentMethod::Pending);
        let saved = f.db.orders().finalize(&plan, "u-seller").await.unwrap();
        assert_eq!(saved.order.payment_status, PaymentStatus::Pending);

        let paid = f
            .db
            .orders()
            .set_payment(&saved.order.id, PaymentMethod::Transfer)
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_sequential_order_numbers() {
        let f = fixture(5, 0).await;
        let plan = plan(&f, &cart(&[(&f.a, 1)]), PaymentMethod::Cash);

        let first = f.db.orders().finalize(&plan, "u-1").await.unwrap();
        let second = f.db.orders().finalize(&plan, "u-1").await.unwrap();
        assert!(first.order.order_number.ends_with("-0001"));
        assert!(second.order.order_number.ends_with("-0002"));
    }

    #[tokio::test]
    async fn test_edit_reverses_then_reapplies() {
        let f = fixture(3, 10).await;
        let original = plan(&f, &cart(&[(&f.a, 3)]), PaymentMethod::Cash);
        let saved = f.db.orders().finalize(&original, "u-1").await.unwrap();
        assert_eq!(f.db.inventory().on_hand(&f.a.id).await.unwrap(), 0);

        // Keep all 3 of A (only possible after reversal) and add 4 of B
        let edited_plan = plan(&f, &cart(&[(&f.a, 3), (&f.b, 4)]), PaymentMethod::Card);
        let edited = f
            .db
            .orders()
            .edit(&saved.order.id, &edited_plan, "u-1")
            .await
            .unwrap();

        assert_eq!(edited.items.len(), 2);
        assert_eq!(edited.order.subtotal.minor(), 5000);
        assert_eq!(edited.order.order_number, saved.order.order_number);
        assert_eq!(f.db.inventory().on_hand(&f.a.id).await.unwrap(), 0);
        assert_eq!(f.db.inventory().on_hand(&f.b.id).await.unwrap(), 6);

        let movements = f.db.inventory().movements_for_ref(&saved.order.id).await.unwrap();
        let edit_moves: Vec<_> = movements
            .iter()
            .filter(|m| m.reason == MovementReason::OrderEdit)
            .collect();
        assert_eq!(edit_moves.len(), 3);
        assert_eq!(edit_moves[0].kind, MovementKind::Return);
        assert_eq!(edit_moves[0].delta, 3);

        // Audit: item quantity equals replay of all its movements
        let history = f.db.inventory().movements_for_product(&f.a.id, 100).await.unwrap();
        let replayed: i64 = history.iter().map(|m| m.delta).sum();
        assert_eq!(replayed, 0);
    }

    #[tokio::test]
    async fn test_failed_edit_rolls_back() {
        let f = fixture(2, 1).await;
        let original = plan(&f, &cart(&[(&f.a, 2)]), PaymentMethod::Cash);
        let saved = f.db.orders().finalize(&original, "u-1").await.unwrap();

        let too_much = plan(&f, &cart(&[(&f.b, 5)]), PaymentMethod::Cash);
        let err = f
            .db
            .orders()
            .edit(&saved.order.id, &too_much, "u-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        // Reversal was rolled back with the rest
        assert_eq!(f.db.inventory().on_hand(&f.a.id).await.unwrap(), 0);
        let loaded = f.db.orders().get(&saved.order.id).await.unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let f = fixture(4, 0).await;
        let saved = f
            .db
            .orders()
            .finalize(&plan(&f, &cart(&[(&f.a, 3)]), PaymentMethod::Cash), "u-1")
            .await
            .unwrap();

        let cancelled = f.db.orders().cancel(&saved.order.id, "u-admin").await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(f.db.inventory().on_hand(&f.a.id).await.unwrap(), 4);

        let again = f.db.orders().cancel(&saved.order.id, "u-admin").await.unwrap_err();
        assert!(matches!(again, DbError::Core(CoreError::InvalidStatus { .. })));
        assert_eq!(f.db.inventory().on_hand(&f.a.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_find_by_customer_and_status() {
        let f = fixture(5, 0).await;
        let saved = f
            .db
            .orders()
            .finalize(&plan(&f, &cart(&[(&f.a, 1)]), PaymentMethod::Cash), "u-1")
            .await
            .unwrap();
        f.db.orders()
            .finalize(&plan(&f, &cart(&[(&f.a, 1)]), PaymentMethod::Cash), "u-1")
            .await
            .unwrap();
        f.db.orders().cancel(&saved.order.id, "u-1").await.unwrap();

        let confirmed = f
            .db
            .orders()
            .find(&OrderFilter {
                customer_id: Some(f.customer.id.clone()),
                status: Some(OrderStatus::Confirmed),
                from: Some(today()),
                to: Some(today()),
                limit: Some(10),
            })
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_finalize_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(&dir).await;
        let customer = seed_customer(&db, 0, 0).await;
        let refill = seed_product(&db, "BID-20L", 1000, true).await;
        stock(&db, &refill.id, 100).await;

        let cart = cart(&[(&refill, 1)]);
        let plan = plan_order(Some(&customer), &cart, PaymentMethod::Cash, SalesChannel::InPerson, None)
            .unwrap();
        let orders = db.orders();
        let (x, y) = tokio::join!(orders.finalize(&plan, "u-1"), orders.finalize(&plan, "u-2"));

        let (x, y) = (x.unwrap(), y.unwrap());
        assert_ne!(x.order.order_number, y.order.order_number);
        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 98);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_finalize_last_unit() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(&dir).await;
        let customer = seed_customer(&db, 0, 0).await;
        let refill = seed_product(&db, "BID-20L", 1000, true).await;
        stock(&db, &refill.id, 1).await;

        let cart = cart(&[(&refill, 1)]);
        let plan = plan_order(Some(&customer), &cart, PaymentMethod::Cash, SalesChannel::InPerson, None)
            .unwrap();
        let orders = db.orders();
        let (x, y) = tokio::join!(orders.finalize(&plan, "u-1"), orders.finalize(&plan, "u-2"));

        let results = [x, y];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let lost: Vec<&DbError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert!(matches!(
            lost[0].root(),
            DbError::Core(CoreError::InsufficientStock { .. }) | DbError::Core(CoreError::NegativeStock { .. })
        ));

        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 0);
        let history = db.inventory().movements_for_product(&refill.id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
    }
}
