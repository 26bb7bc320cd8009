//! # Route Repository
//!
//! Delivery routes: an order variant that also carries the stop sequence,
//! delivery date and bottle figures.
//!
//! ## Route States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   finalize ──► pending ──── complete ────► completed                   │
//! │                  │  ▲                        (customer.bottles_lent    │
//! │            edit ─┘  │                         += deliver − collect)    │
//! │                  │                                                      │
//! │                  └─────── cancel ─────────► cancelled                  │
//! │                                              (stock restored)          │
//! │                                                                         │
//! │   delete: pending or cancelled only; restores stock if still taken.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot columns (`bottles_in_circulation`, `bottles_owned`) are read
//! from the customer inside the finalize transaction, written once, and never
//! touched afterwards. A snapshot carried by the plan is ignored: the cart may
//! have been open while another of the customer's routes completed.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::customer::{adjust_bottles_lent, bottle_snapshot};
use crate::repository::inventory::{apply_movement_in, check_stock, NewMovement};
use crate::repository::{begin_write, next_daily_sequence, today};
use aquaroute_core::finalize::{document_number, ROUTE_NUMBER_PREFIX};
use aquaroute_core::{
    CoreError, DeliveryRoute, DeliveryRouteItem, DeliveryStatus, MovementReason, PlannedLine,
    RoutePlan, RouteWithItems,
};

const COLUMNS: &str = "id, route_number, customer_id, sequence, delivery_date, payment_status, \
                       payment_method, subtotal, tax, total, bottles_to_deliver, bottles_to_collect, \
                       bottles_in_circulation, bottles_owned, bottle_balance, observation, \
                       delivery_status, created_by, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, route_id, product_id, quantity, unit_price, line_total, created_at";

#[derive(Debug, Clone)]
pub struct RouteRepository {
    pool: SqlitePool,
}

fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

async fn load_route(conn: &mut SqliteConnection, id: &str) -> DbResult<DeliveryRoute> {
    let sql = format!("SELECT {COLUMNS} FROM delivery_routes WHERE id = ?1");
    sqlx::query_as::<_, DeliveryRoute>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("DeliveryRoute", id))
}

async fn load_items(conn: &mut SqliteConnection, route_id: &str) -> DbResult<Vec<DeliveryRouteItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM delivery_route_items WHERE route_id = ?1 ORDER BY rowid"
    );
    let items = sqlx::query_as::<_, DeliveryRouteItem>(&sql)
        .bind(route_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

async fn insert_items(
    conn: &mut SqliteConnection,
    route_id: &str,
    lines: &[PlannedLine],
    now: DateTime<Utc>,
) -> DbResult<Vec<DeliveryRouteItem>> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = DeliveryRouteItem {
            id: Uuid::new_v4().to_string(),
            route_id: route_id.to_string(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO delivery_route_items (
                id, route_id, product_id, quantity, unit_price, line_total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.route_id)
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
    route_id: &str,
    actor_id: &str,
) -> DbResult<()> {
    for line in lines {
        let movement = NewMovement::outgoing(&line.product_id, line.quantity, reason, route_id, actor_id);
        apply_movement_in(conn, &movement).await?;
    }
    Ok(())
}

async fn return_stock(
    conn: &mut SqliteConnection,
    items: &[DeliveryRouteItem],
    reason: MovementReason,
    route_id: &str,
    actor_id: &str,
) -> DbResult<()> {
    for item in items {
        let movement = NewMovement::returning(&item.product_id, item.quantity, reason, route_id, actor_id);
        apply_movement_in(conn, &movement).await?;
    }
    Ok(())
}

fn invalid_status(route: &DeliveryRoute, operation: &str) -> DbError {
    CoreError::InvalidStatus {
        entity: "Route".to_string(),
        id: route.route_number.clone(),
        status: format!("{:?}", route.delivery_status).to_lowercase(),
        operation: operation.to_string(),
    }
    .into()
}

async fn set_status(
    conn: &mut SqliteConnection,
    route_id: &str,
    status: DeliveryStatus,
) -> DbResult<DeliveryRoute> {
    let sql = format!(
        "UPDATE delivery_routes SET delivery_status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING {COLUMNS}"
    );
    let route = sqlx::query_as::<_, DeliveryRoute>(&sql)
        .bind(route_id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(route)
}

impl RouteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RouteRepository { pool }
    }

    /// Persists a planned route: header, items, one movement per line.
    ///
    /// The bottle snapshot and balance are taken from the customer row at
    /// this moment, not from the plan.
    pub async fn finalize(&self, plan: &RoutePlan, actor_id: &str) -> DbResult<RouteWithItems> {
        if plan.lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let mut tx = begin_write(&self.pool).await?;

        check_stock(&mut tx, &plan.lines)
            .await
            .map_err(|e| DbError::at("check stock", e))?;

        let snapshot = bottle_snapshot(&mut tx, &plan.customer_id)
            .await
            .map_err(|e| DbError::at("snapshot customer bottles", e))?;
        let bottle_balance = snapshot.in_circulation + plan.bottles_to_deliver - plan.bottles_to_collect;
        if snapshot.in_circulation != plan.bottles_in_circulation {
            debug!(
                customer_id = %plan.customer_id,
                planned = plan.bottles_in_circulation,
                current = snapshot.in_circulation,
                "Customer bottles moved since selection"
            );
        }

        let now = Utc::now();
        let date = today();
        let daily = next_daily_sequence(&mut tx, "delivery_routes", "route_number", ROUTE_NUMBER_PREFIX, date)
            .await
            .map_err(|e| DbError::at("number route", e))?;

        let route = DeliveryRoute {
            id: Uuid::new_v4().to_string(),
            route_number: document_number(ROUTE_NUMBER_PREFIX, date, daily),
            customer_id: plan.customer_id.clone(),
            sequence: plan.sequence,
            delivery_date: plan.delivery_date,
            payment_status: plan.payment_status,
            payment_method: plan.payment_method,
            subtotal: plan.subtotal,
            tax: plan.tax,
            total: plan.total,
            bottles_to_deliver: plan.bottles_to_deliver,
            bottles_to_collect: plan.bottles_to_collect,
            bottles_in_circulation: snapshot.in_circulation,
            bottles_owned: snapshot.owned,
            bottle_balance,
            observation: plan.observation.clone(),
            delivery_status: DeliveryStatus::Pending,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(route_number = %route.route_number, sequence = route.sequence, "Inserting route");

        sqlx::query(
            r#"
            INSERT INTO delivery_routes (
                id, route_number, customer_id, sequence, delivery_date, payment_status,
                payment_method, subtotal, tax, total, bottles_to_deliver, bottles_to_collect,
                bottles_in_circulation, bottles_owned, bottle_balance, observation,
                delivery_status, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            "#,
        )
        .bind(&route.id)
        .bind(&route.route_number)
        .bind(&route.customer_id)
        .bind(route.sequence)
        .bind(route.delivery_date)
        .bind(route.payment_status)
        .bind(route.payment_method)
        .bind(route.subtotal)
        .bind(route.tax)
        .bind(route.total)
        .bind(route.bottles_to_deliver)
        .bind(route.bottles_to_collect)
        .bind(route.bottles_in_circulation)
        .bind(route.bottles_owned)
        .bind(route.bottle_balance)
        .bind(&route.observation)
        .bind(route.delivery_status)
        .bind(&route.created_by)
        .bind(route.created_at)
        .bind(route.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::at("insert route header", e))?;

        let items = insert_items(&mut tx, &route.id, &plan.lines, now)
            .await
            .map_err(|e| DbError::at("insert route items", e))?;

        take_stock(&mut tx, &plan.lines, MovementReason::Route, &route.id, actor_id)
            .await
            .map_err(|e| DbError::at("apply inventory movements", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(
            route_number = %route.route_number,
            customer_id = %route.customer_id,
            delivery_date = %route.delivery_date,
            total = %route.total,
            bottle_balance = route.bottle_balance,
            actor = %actor_id,
            "Route finalized"
        );

        Ok(RouteWithItems { route, items })
    }

    /// Replaces a pending route's lines and route-form figures.
    ///
    /// The snapshot columns keep the values captured at finalize.
    pub async fn edit(
        &self,
        route_id: &str,
        plan: &RoutePlan,
        actor_id: &str,
    ) -> DbResult<RouteWithItems> {
        if plan.lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let mut tx = begin_write(&self.pool).await?;

        let route = load_route(&mut tx, route_id).await?;
        if route.delivery_status != DeliveryStatus::Pending {
            return Err(invalid_status(&route, "edit"));
        }
        let prior = load_items(&mut tx, route_id)
            .await
            .map_err(|e| DbError::at("load route items", e))?;

        return_stock(&mut tx, &prior, MovementReason::RouteEdit, route_id, actor_id)
            .await
            .map_err(|e| DbError::at("reverse prior movements", e))?;

        check_stock(&mut tx, &plan.lines)
            .await
            .map_err(|e| DbError::at("check stock", e))?;

        sqlx::query("DELETE FROM delivery_route_items WHERE route_id = ?1")
            .bind(route_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::at("delete route items", e))?;

        let now = Utc::now();
        let items = insert_items(&mut tx, route_id, &plan.lines, now)
            .await
            .map_err(|e| DbError::at("insert route items", e))?;

        take_stock(&mut tx, &plan.lines, MovementReason::RouteEdit, route_id, actor_id)
            .await
            .map_err(|e| DbError::at("apply inventory movements", e))?;

        let balance = route.bottles_in_circulation + plan.bottles_to_deliver - plan.bottles_to_collect;
        let sql = format!(
            r#"
            UPDATE delivery_routes SET
                sequence = ?2, delivery_date = ?3, payment_status = ?4, payment_method = ?5,
                subtotal = ?6, tax = ?7, total = ?8, bottles_to_deliver = ?9,
                bottles_to_collect = ?10, bottle_balance = ?11, observation = ?12, updated_at = ?13
            WHERE id = ?1
            RETURNING {COLUMNS}
            "#
        );
        let route = sqlx::query_as::<_, DeliveryRoute>(&sql)
            .bind(route_id)
            .bind(plan.sequence)
            .bind(plan.delivery_date)
            .bind(plan.payment_status)
            .bind(plan.payment_method)
            .bind(plan.subtotal)
            .bind(plan.tax)
            .bind(plan.total)
            .bind(plan.bottles_to_deliver)
            .bind(plan.bottles_to_collect)
            .bind(balance)
            .bind(&plan.observation)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::at("update route header", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(route_number = %route.route_number, items = items.len(), actor = %actor_id, "Route edited");
        Ok(RouteWithItems { route, items })
    }

    /// Marks a pending route delivered and moves the customer's live
    /// `bottles_lent` by `to_deliver − to_collect`.
    pub async fn complete(&self, route_id: &str, actor_id: &str) -> DbResult<DeliveryRoute> {
        let mut tx = begin_write(&self.pool).await?;

        let route = load_route(&mut tx, route_id).await?;
        if route.delivery_status != DeliveryStatus::Pending {
            return Err(invalid_status(&route, "complete"));
        }

        let route = set_status(&mut tx, route_id, DeliveryStatus::Completed)
            .await
            .map_err(|e| DbError::at("update route status", e))?;

        let net = route.bottles_to_deliver - route.bottles_to_collect;
        let lent = adjust_bottles_lent(&mut tx, &route.customer_id, net)
            .await
            .map_err(|e| DbError::at("update customer bottles", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(
            route_number = %route.route_number,
            net_bottles = net,
            bottles_lent = lent,
            actor = %actor_id,
            "Route completed"
        );
        Ok(route)
    }

    /// Cancels a pending route and puts its stock back.
    pub async fn cancel(&self, route_id: &str, actor_id: &str) -> DbResult<DeliveryRoute> {
        let mut tx = begin_write(&self.pool).await?;

        let route = load_route(&mut tx, route_id).await?;
        if route.delivery_status != DeliveryStatus::Pending {
            return Err(invalid_status(&route, "cancel"));
        }
        let items = load_items(&mut tx, route_id)
            .await
            .map_err(|e| DbError::at("load route items", e))?;

        return_stock(&mut tx, &items, MovementReason::RouteCancel, route_id, actor_id)
            .await
            .map_err(|e| DbError::at("restore inventory", e))?;

        let route = set_status(&mut tx, route_id, DeliveryStatus::Cancelled)
            .await
            .map_err(|e| DbError::at("update route status", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(route_number = %route.route_number, actor = %actor_id, "Route cancelled");
        Ok(route)
    }

    /// Deletes a route and its items.
    ///
    /// A pending route's stock is restored first. Completed routes can't be
    /// deleted: their bottles already moved to the customer.
    pub async fn delete(&self, route_id: &str, actor_id: &str) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let route = load_route(&mut tx, route_id).await?;
        match route.delivery_status {
            DeliveryStatus::Completed => return Err(invalid_status(&route, "delete")),
            DeliveryStatus::Pending => {
                let items = load_items(&mut tx, route_id)
                    .await
                    .map_err(|e| DbError::at("load route items", e))?;
                return_stock(&mut tx, &items, MovementReason::RouteCancel, route_id, actor_id)
                    .await
                    .map_err(|e| DbError::at("restore inventory", e))?;
            }
            DeliveryStatus::Cancelled => {}
        }

        sqlx::query("DELETE FROM delivery_routes WHERE id = ?1")
            .bind(route_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::at("delete route", e))?;

        tx.commit().await.map_err(|e| DbError::at("commit", e))?;

        info!(route_number = %route.route_number, actor = %actor_id, "Route deleted");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> DbResult<RouteWithItems> {
        let mut conn = self.pool.acquire().await?;
        let route = load_route(&mut conn, id).await?;
        let items = load_items(&mut conn, id).await?;
        Ok(RouteWithItems { route, items })
    }

    /// The day's stops in driving order.
    pub async fn list_by_date(&self, date: NaiveDate) -> DbResult<Vec<DeliveryRoute>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM delivery_routes WHERE delivery_date = ?1 ORDER BY sequence, route_number"
        );
        let routes = sqlx::query_as::<_, DeliveryRoute>(&sql)
            .bind(date_text(date))
            .fetch_all(&self.pool)
            .await?;

        debug!(date = %date, count = routes.len(), "Listed routes");
        Ok(routes)
    }

    /// Routes with a delivery date in `[from, to]`.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<DeliveryRoute>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM delivery_routes \
             WHERE delivery_date >= ?1 AND delivery_date <= ?2 \
             ORDER BY delivery_date, sequence"
        );
        let routes = sqlx::query_as::<_, DeliveryRoute>(&sql)
            .bind(date_text(from))
            .bind(date_text(to))
            .fetch_all(&self.pool)
            .await?;
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_customer, seed_product, stock, test_db};
    use aquaroute_core::finalize::plan_route;
    use aquaroute_core::{
        BottleLedger, BottleSnapshot, CartBuilder, Customer, PaymentMethod, Product, RouteDetails,
        TaxRate,
    };
    use chrono::Duration;

    fn route_plan(
        customer: &Customer,
        lines: &[(&Product, i64)],
        sequence: i64,
        collect: i64,
    ) -> RoutePlan {
        let mut cart = CartBuilder::new(TaxRate::IVA);
        let mut ledger = BottleLedger::new(BottleSnapshot::of(customer));
        for (product, quantity) in lines {
            if let Some(change) = cart.add_line(product, 1_000).unwrap() {
                ledger.record_line_change(&change);
            }
            if let Some(change) = cart.set_line_quantity(&product.id, *quantity, 1_000) {
                ledger.record_line_change(&change);
            }
        }
        ledger.set_to_collect(collect);

        let details = RouteDetails {
            sequence,
            delivery_date: today(),
            ledger,
            observation: Some("Portón azul".to_string()),
        };
        plan_route(Some(customer), &cart, PaymentMethod::Cash, details).unwrap()
    }

    #[tokio::test]
    async fn test_finalize_persists_bottle_figures() {
        let db = test_db().await;
        let customer = seed_customer(&db, 5, 1).await;
        let refill = seed_product(&db, "BID-20L", 2500, true).await;
        stock(&db, &refill.id, 10).await;

        let plan = route_plan(&customer, &[(&refill, 3)], 1, 2);
        let saved = db.routes().finalize(&plan, "u-driver").await.unwrap();

        let route = &saved.route;
        assert!(route.route_number.starts_with("R-"));
        assert_eq!(route.delivery_status, DeliveryStatus::Pending);
        assert_eq!(route.bottles_to_deliver, 3);
        assert_eq!(route.bottles_to_collect, 2);
        assert_eq!(route.bottles_in_circulation, 5);
        assert_eq!(route.bottles_owned, 1);
        assert_eq!(route.bottle_balance, 6);
        assert_eq!(saved.items.len(), 1);
        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 7);

        let movements = db.inventory().movements_for_ref(&route.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].reason, MovementReason::Route);
    }

    #[tokio::test]
    async fn test_complete_moves_live_counter_only() {
        let db = test_db().await;
        let customer = seed_customer(&db, 5, 0).await;
        let refill = seed_product(&db, "BID-20L", 2500, true).await;
        stock(&db, &refill.id, 10).await;

        let saved = db
            .routes()
            .finalize(&route_plan(&customer, &[(&refill, 3)], 1, 2), "u-driver")
            .await
            .unwrap();
        let completed = db.routes().complete(&saved.route.id, "u-driver").await.unwrap();

        assert_eq!(completed.delivery_status, DeliveryStatus::Completed);
        assert_eq!(completed.bottles_in_circulation, 5);
        assert_eq!(db.customers().get(&customer.id).await.unwrap().bottles_lent, 6);

        let again = db.routes().complete(&saved.route.id, "u-driver").await.unwrap_err();
        assert!(matches!(again, DbError::Core(CoreError::InvalidStatus { .. })));
        assert!(matches!(
            db.routes().delete(&saved.route.id, "u-admin").await,
            Err(DbError::Core(CoreError::InvalidStatus { .. }))
        ));
    }

    #[tokio::test]
    async fn test_list_by_date_in_sequence() {
        let db = test_db().await;
        let customer = seed_customer(&db, 0, 0).await;
        let refill = seed_product(&db, "BID-20L", 2500, true).await;
        stock(&db, &refill.id, 10).await;

        for sequence in [3, 1, 2] {
            db.routes()
                .finalize(&route_plan(&customer, &[(&refill, 1)], sequence, 0), "u-1")
                .await
                .unwrap();
        }

        let routes = db.routes().list_by_date(today()).await.unwrap();
        let order: Vec<i64> = routes.iter().map(|r| r.sequence).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(db
            .routes()
            .list_by_date(today() + Duration::days(1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_cancel_and_delete_restore_stock() {
        let db = test_db().await;
        let customer = seed_customer(&db, 0, 0).await;
        let refill = seed_product(&db, "BID-20L", 2500, true).await;
        stock(&db, &refill.id, 5).await;

        let first = db
            .routes()
            .finalize(&route_plan(&customer, &[(&refill, 2)], 1, 0), "u-1")
            .await
            .unwrap();
        let second = db
            .routes()
            .finalize(&route_plan(&customer, &[(&refill, 3)], 2, 0), "u-1")
            .await
            .unwrap();
        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 0);

        db.routes().cancel(&first.route.id, "u-1").await.unwrap();
        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 2);

        // Deleting a cancelled route doesn't restore twice
        db.routes().delete(&first.route.id, "u-1").await.unwrap();
        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 2);

        db.routes().delete(&second.route.id, "u-1").await.unwrap();
        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 5);
        assert!(matches!(
            db.routes().get(&second.route.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_number_not_reused_after_delete() {
        let db = test_db().await;
        let customer = seed_customer(&db, 0, 0).await;
        let refill = seed_product(&db, "BID-20L", 2500, true).await;
        stock(&db, &refill.id, 10).await;

        let plan = route_plan(&customer, &[(&refill, 1)], 1, 0);
        let first = db.routes().finalize(&plan, "u-1").await.unwrap();
        let second = db.routes().finalize(&plan, "u-1").await.unwrap();
        db.routes().delete(&first.route.id, "u-1").await.unwrap();

        let third = db.routes().finalize(&plan, "u-1").await.unwrap();
        assert!(second.route.route_number.ends_with("-0002"));
        assert!(third.route.route_number.ends_with("-0003"));
    }

    #[tokio::test]
    async fn test_finalize_snapshots_current_customer_bottles() {
        let db = test_db().await;
        let customer = seed_customer(&db, 5, 2).await;
        let refill = seed_product(&db, "BID-20L", 2500, true).await;
        stock(&db, &refill.id, 10).await;

        // Cart built against 5 lent; another route completes meanwhile
        let plan = route_plan(&customer, &[(&refill, 3)], 1, 1);
        let other = db
            .routes()
            .finalize(&route_plan(&customer, &[(&refill, 4)], 2, 0), "u-2")
            .await
            .unwrap();
        db.routes().complete(&other.route.id, "u-2").await.unwrap();
        assert_eq!(db.customers().get(&customer.id).await.unwrap().bottles_lent, 9);

        let saved = db.routes().finalize(&plan, "u-1").await.unwrap();
        assert_eq!(saved.route.bottles_in_circulation, 9);
        assert_eq!(saved.route.bottles_owned, 2);
        assert_eq!(saved.route.bottle_balance, 9 + 3 - 1);
    }

    #[tokio::test]
    async fn test_edit_keeps_snapshots() {
        let db = test_db().await;
        let customer = seed_customer(&db, 4, 0).await;
        let refill = seed_product(&db, "BID-20L", 2500, true).await;
        stock(&db, &refill.id, 3).await;

        let saved = db
            .routes()
            .finalize(&route_plan(&customer, &[(&refill, 3)], 1, 0), "u-1")
            .await
            .unwrap();

        let mut changed = customer.clone();
        changed.bottles_lent = 99;
        let edited = db
            .routes()
            .edit(&saved.route.id, &route_plan(&changed, &[(&refill, 2)], 4, 1), "u-1")
            .await
            .unwrap();

        assert_eq!(edited.route.sequence, 4);
        assert_eq!(edited.route.bottles_in_circulation, 4);
        assert_eq!(edited.route.bottles_to_deliver, 2);
        assert_eq!(edited.route.bottle_balance, 5);
        assert_eq!(db.inventory().on_hand(&refill.id).await.unwrap(), 1);
    }
}
