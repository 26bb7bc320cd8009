//! # Inventory Repository
//!
//! On-hand quantities per product and the append-only movement log.
//!
//! ## Movement Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    apply_movement(product, delta, ...)                  │
//! │                                                                         │
//! │  1. Locate the warehouse item                                          │
//! │     └── none yet? create { available, new, quantity: 0 }               │
//! │                                                                         │
//! │  2. Floor-checked update, evaluated by SQLite:                         │
//! │     UPDATE inventory_items SET quantity = quantity + Δ                 │
//! │      WHERE id = ? AND quantity + Δ >= 0                                │
//! │      RETURNING quantity                                                │
//! │     └── no row returned? NegativeStock, nothing changed                │
//! │                                                                         │
//! │  3. Append movement { previous, new, Δ, kind, reason, actor }          │
//! │                                                                         │
//! │  Steps 2-3 share one transaction, so the item quantity always          │
//! │  equals the sum of its movement deltas.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Not Read-Then-Write
//! Two sellers finalizing the last refill at the same time would both read
//! quantity 1 and both write 0. The conditional update lets SQLite decide:
//! the second writer gets no row back and fails with `NegativeStock`.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use aquaroute_core::finalize::ensure_stock;
use aquaroute_core::{
    CoreError, InventoryAlert, InventoryItem, InventoryLocation, InventoryMovement, InventoryStatus,
    ItemCondition, MovementKind, MovementReason, PlannedLine,
};

// =============================================================================
// Inputs and Views
// =============================================================================

/// A stock change to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub product_id: String,
    /// Signed change. Negative takes stock out.
    pub delta: i64,
    pub kind: MovementKind,
    pub reason: MovementReason,
    /// Order or route this movement belongs to.
    pub order_ref: Option<String>,
    pub notes: Option<String>,
    pub actor_id: String,
}

impl NewMovement {
    /// A manual count correction or receipt entered from the inventory screen.
    pub fn adjustment(
        product_id: impl Into<String>,
        delta: i64,
        notes: Option<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        NewMovement {
            product_id: product_id.into(),
            delta,
            kind: MovementKind::Adjustment,
            reason: MovementReason::Adjustment,
            order_ref: None,
            notes,
            actor_id: actor_id.into(),
        }
    }

    /// A sale or route line taking stock out.
    pub(crate) fn outgoing(
        product_id: &str,
        quantity: i64,
        reason: MovementReason,
        order_ref: &str,
        actor_id: &str,
    ) -> Self {
        NewMovement {
            product_id: product_id.to_string(),
            delta: -quantity,
            kind: MovementKind::Out,
            reason,
            order_ref: Some(order_ref.to_string()),
            notes: None,
            actor_id: actor_id.to_string(),
        }
    }

    /// Puts a previously sold line back (edit reversal, cancel, delete).
    pub(crate) fn returning(
        product_id: &str,
        quantity: i64,
        reason: MovementReason,
        order_ref: &str,
        actor_id: &str,
    ) -> Self {
        NewMovement {
            product_id: product_id.to_string(),
            delta: quantity,
            kind: MovementKind::Return,
            reason,
            order_ref: Some(order_ref.to_string()),
            notes: None,
            actor_id: actor_id.to_string(),
        }
    }
}

/// Warehouse stock of one product, for the inventory screen.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductStock {
    pub product_id: String,
    pub code: String,
    pub name: String,
    pub quantity: i64,
}

// =============================================================================
// Connection-level helpers (shared with the finalizers)
// =============================================================================

const ITEM_COLUMNS: &str = "id, product_id, quantity, location, status, condition, \
                            last_count_date, created_at, updated_at";

/// The available warehouse item of a product, if one exists.
pub(crate) async fn warehouse_item(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Option<InventoryItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items \
         WHERE product_id = ?1 AND location = 'warehouse' AND status = 'available'"
    );
    let item = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// On-hand quantity used for stock checks. Products never counted are 0.
pub(crate) async fn on_hand(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    Ok(warehouse_item(conn, product_id)
        .await?
        .map(|item| item.quantity)
        .unwrap_or(0))
}

/// Checks planned lines against on-hand stock inside the caller's
/// transaction, before anything is written.
pub(crate) async fn check_stock(conn: &mut SqliteConnection, lines: &[PlannedLine]) -> DbResult<()> {
    let mut available: HashMap<&str, i64> = HashMap::new();
    for line in lines {
        if !available.contains_key(line.product_id.as_str()) {
            let quantity = on_hand(conn, &line.product_id).await?;
            available.insert(&line.product_id, quantity);
        }
    }

    ensure_stock(lines, |id| available.get(id).copied().unwrap_or(0)).map_err(|err| {
        warn!(error = %err, "Stock check rejected");
        DbError::from(err)
    })
}

async fn create_warehouse_item(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<InventoryItem> {
    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(DbError::not_found("Product", product_id));
    }

    let now = Utc::now();
    let item = InventoryItem {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        quantity: 0,
        location: InventoryLocation::Warehouse,
        status: InventoryStatus::Available,
        condition: ItemCondition::New,
        last_count_date: None,
        created_at: now,
        updated_at: now,
    };

    debug!(product_id = %product_id, item_id = %item.id, "Creating warehouse item");

    sqlx::query(
        r#"
        INSERT INTO inventory_items (
            id, product_id, quantity, location, status, condition,
            last_count_date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.location)
    .bind(item.status)
    .bind(item.condition)
    .bind(item.last_count_date)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(item)
}

/// The atomic, floor-checked quantity update.
///
/// Returns the new quantity, or `None` when the change would go below zero
/// (in which case nothing was written).
pub(crate) async fn update_inventory(
    conn: &mut SqliteConnection,
    item_id: &str,
    delta: i64,
) -> DbResult<Option<i64>> {
    let now = Utc::now();
    let new_quantity: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE inventory_items
        SET quantity = quantity + ?1,
            last_count_date = ?2,
            updated_at = ?2
        WHERE id = ?3 AND quantity + ?1 >= 0
        RETURNING quantity
        "#,
    )
    .bind(delta)
    .bind(now)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(new_quantity)
}

/// Applies one movement on an open connection or transaction.
pub(crate) async fn apply_movement_in(
    conn: &mut SqliteConnection,
    movement: &NewMovement,
) -> DbResult<InventoryMovement> {
    let item = match warehouse_item(conn, &movement.product_id).await? {
        Some(item) => item,
        None => create_warehouse_item(conn, &movement.product_id).await?,
    };

    let Some(new_quantity) = update_inventory(conn, &item.id, movement.delta).await? else {
        let code: Option<String> = sqlx::query_scalar("SELECT code FROM products WHERE id = ?1")
            .bind(&movement.product_id)
            .fetch_optional(&mut *conn)
            .await?;
        let current = on_hand(conn, &movement.product_id).await?;
        warn!(
            product_id = %movement.product_id,
            current,
            delta = movement.delta,
            "Rejected movement below zero"
        );
        return Err(CoreError::NegativeStock {
            product: code.unwrap_or_else(|| movement.product_id.clone()),
            current,
            delta: movement.delta,
        }
        .into());
    };

    let record = InventoryMovement {
        id: Uuid::new_v4().to_string(),
        inventory_id: item.id,
        product_id: movement.product_id.clone(),
        kind: movement.kind,
        delta: movement.delta,
        previous_quantity: new_quantity - movement.delta,
        new_quantity,
        order_ref: movement.order_ref.clone(),
        reason: movement.reason,
        notes: movement.notes.clone(),
        actor_id: movement.actor_id.clone(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, inventory_id, product_id, kind, delta,
            previous_quantity, new_quantity, order_ref, reason, notes,
            actor_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&record.id)
    .bind(&record.inventory_id)
    .bind(&record.product_id)
    .bind(record.kind)
    .bind(record.delta)
    .bind(record.previous_quantity)
    .bind(record.new_quantity)
    .bind(&record.order_ref)
    .bind(record.reason)
    .bind(&record.notes)
    .bind(&record.actor_id)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %record.product_id,
        delta = record.delta,
        previous = record.previous_quantity,
        new = record.new_quantity,
        reason = %record.reason,
        "Movement applied"
    );

    Ok(record)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventory items, movements and alerts.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Records a stock change and its movement in one transaction.
    ///
    /// ## Errors
    /// - `Core(NegativeStock)` - the change would leave quantity below zero
    /// - `NotFound` - unknown product
    pub async fn apply_movement(&self, movement: NewMovement) -> DbResult<InventoryMovement> {
        let mut tx = begin_write(&self.pool).await?;
        let record = apply_movement_in(&mut *tx, &movement).await?;
        tx.commit().await?;

        info!(
            product_id = %record.product_id,
            delta = record.delta,
            new_quantity = record.new_quantity,
            reason = %record.reason,
            actor = %record.actor_id,
            "Inventory movement recorded"
        );
        Ok(record)
    }

    /// Current on-hand quantity of a product (0 if never stocked).
    pub async fn on_hand(&self, product_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        on_hand(&mut *conn, product_id).await
    }

    pub async fn get_item(&self, product_id: &str) -> DbResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        warehouse_item(&mut *conn, product_id).await
    }

    pub async fn list_items(&self) -> DbResult<Vec<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY created_at");
        let items = sqlx::query_as::<_, InventoryItem>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Warehouse stock for every active product, by name.
    pub async fn stock_levels(&self) -> DbResult<Vec<ProductStock>> {
        let rows = sqlx::query_as::<_, ProductStock>(
            r#"
            SELECT
                p.id AS product_id,
                p.code,
                p.name,
                COALESCE(i.quantity, 0) AS quantity
            FROM products p
            LEFT JOIN inventory_items i
                ON i.product_id = p.id
               AND i.location = 'warehouse'
               AND i.status = 'available'
            WHERE p.is_active = 1
            ORDER BY p.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Movement history of a product, newest first.
    pub async fn movements_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<InventoryMovement>> {
        debug!(product_id = %product_id, limit, "Loading movement history");

        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, inventory_id, product_id, kind, delta, previous_quantity,
                   new_quantity, order_ref, reason, notes, actor_id, created_at
            FROM inventory_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    /// Movements written for one order or route, oldest first.
    pub async fn movements_for_ref(&self, order_ref: &str) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, inventory_id, product_id, kind, delta, previous_quantity,
                   new_quantity, order_ref, reason, notes, actor_id, created_at
            FROM inventory_movements
            WHERE order_ref = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_ref)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    // -------------------------------------------------------------------------
    // Alerts
    // -------------------------------------------------------------------------

    pub async fn list_alerts(&self) -> DbResult<Vec<InventoryAlert>> {
        let alerts = sqlx::query_as::<_, InventoryAlert>(
            r#"
            SELECT id, product_id, min_quantity, alert_quantity, enabled, created_at
            FROM inventory_alerts
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(alerts)
    }

    /// Creates or replaces the alert thresholds of a product.
    pub async fn upsert_alert(
        &self,
        product_id: &str,
        min_quantity: i64,
        alert_quantity: i64,
        enabled: bool,
    ) -> DbResult<InventoryAlert> {
        aquaroute_core::validation::validate_count("min_quantity", min_quantity)?;
        aquaroute_core::validation::validate_count("alert_quantity", alert_quantity)?;

        debug!(product_id = %product_id, min_quantity, alert_quantity, "Upserting alert");

        let alert = sqlx::query_as::<_, InventoryAlert>(
            r#"
            INSERT INTO inventory_alerts (
                id, product_id, min_quantity, alert_quantity, enabled, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (product_id) DO UPDATE SET
                min_quantity = excluded.min_quantity,
                alert_quantity = excluded.alert_quantity,
                enabled = excluded.enabled
            RETURNING id, product_id, min_quantity, alert_quantity, enabled, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(product_id)
        .bind(min_quantity)
        .bind(alert_quantity)
        .bind(enabled)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(alert)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_product, test_db};

    #[tokio::test]
    async fn test_first_movement_creates_item() {
        let db = test_db().await;
        let product = seed_product(&db, "BID-20L", 2500, true).await;

        assert_eq!(db.inventory().on_hand(&product.id).await.unwrap(), 0);

        let movement = db
            .inventory()
            .apply_movement(NewMovement::adjustment(&product.id, 10, Some("Compra".into()), "u-1"))
            .await
            .unwrap();

        assert_eq!(movement.previous_quantity, 0);
        assert_eq!(movement.new_quantity, 10);
        assert_eq!(movement.kind, MovementKind::Adjustment);

        let item = db.inventory().get_item(&product.id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 10);
        assert_eq!(item.location, InventoryLocation::Warehouse);
        assert!(item.last_count_date.is_some());
    }

    #[tokio::test]
    async fn test_negative_stock_rejected_unchanged() {
        let db = test_db().await;
        let product = seed_product(&db, "DISP-01", 9000, false).await;
        db.inventory()
            .apply_movement(NewMovement::adjustment(&product.id, 2, None, "u-1"))
            .await
            .unwrap();

        let err = db
            .inventory()
            .apply_movement(NewMovement::adjustment(&product.id, -3, None, "u-1"))
            .await
            .unwrap_err();

        match err {
            DbError::Core(CoreError::NegativeStock {
                product,
                current,
                delta,
            }) => {
                assert_eq!(product, "DISP-01");
                assert_eq!(current, 2);
                assert_eq!(delta, -3);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(db.inventory().on_hand(&product.id).await.unwrap(), 2);
        assert_eq!(
            db.inventory()
                .movements_for_product(&product.id, 50)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_quantity_equals_replay_of_movements() {
        let db = test_db().await;
        let product = seed_product(&db, "BID-20L", 2500, true).await;

        for delta in [10, -4, 7, -13, 5] {
            db.inventory()
                .apply_movement(NewMovement::adjustment(&product.id, delta, None, "u-1"))
                .await
                .unwrap();
        }
        // Rejected, must not leave a trace
        let _ = db
            .inventory()
            .apply_movement(NewMovement::adjustment(&product.id, -100, None, "u-1"))
            .await;

        let history = db
            .inventory()
            .movements_for_product(&product.id, 100)
            .await
            .unwrap();
        let replayed: i64 = history.iter().map(|m| m.delta).sum();

        assert_eq!(history.len(), 5);
        assert_eq!(replayed, 5);
        assert_eq!(db.inventory().on_hand(&product.id).await.unwrap(), replayed);
        // Newest first
        assert_eq!(history[0].delta, 5);
        assert!(history.iter().all(|m| m.new_quantity >= 0));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_db().await;
        let err = db
            .inventory()
            .apply_movement(NewMovement::adjustment("missing", 1, None, "u-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_alert_upsert_and_stock_levels() {
        let db = test_db().await;
        let product = seed_product(&db, "BID-20L", 2500, true).await;

        db.inventory()
            .upsert_alert(&product.id, 5, 10, true)
            .await
            .unwrap();
        let updated = db
            .inventory()
            .upsert_alert(&product.id, 8, 12, true)
            .await
            .unwrap();
        assert_eq!(updated.min_quantity, 8);
        assert_eq!(db.inventory().list_alerts().await.unwrap().len(), 1);

        let levels = db.inventory().stock_levels().await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].quantity, 0);
    }
}
