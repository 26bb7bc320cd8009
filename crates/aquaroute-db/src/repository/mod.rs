//! # Repository Module
//!
//! Database repository implementations for AquaRoute.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories                                         │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │  db.orders().finalize(&plan, "u-7")                            │
//! │       ▼                                                                 │
//! │  OrderRepository ──┐                                                   │
//! │  RouteRepository ──┼──► inventory::apply_movement_in(&mut tx, ..)      │
//! │  InventoryRepo ────┘        (shared connection-level helper)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (one transaction per multi-step write)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customer CRUD, search, code sequence
//! - [`product::ProductRepository`] - Catalog CRUD
//! - [`inventory::InventoryRepository`] - Stock, movements, alerts
//! - [`order::OrderRepository`] - Sale finalize, edit, cancel
//! - [`route::RouteRepository`] - Route finalize, complete, cancel, delete
//! - [`expense::ExpenseRepository`] - Expense records
//! - [`report::ReportRepository`] - Read models

pub mod customer;
pub mod expense;
pub mod inventory;
pub mod order;
pub mod product;
pub mod report;
pub mod route;

use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};

/// Opens a write transaction holding SQLite's writer lock from the start.
///
/// A deferred `BEGIN` that reads before it writes can't wait on the busy
/// timeout when another writer commits first; it fails with "database is
/// locked". `BEGIN IMMEDIATE` queues writers on the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| DbError::at("begin transaction", e))
}

/// Next daily sequence for a document table (`orders`, `delivery_routes`).
///
/// One past the highest `NNNN` suffix numbered for `date`. Deleted
/// documents leave gaps; numbers are never reused while a later one exists.
pub(crate) async fn next_daily_sequence(
    conn: &mut SqliteConnection,
    table: &'static str,
    number_column: &'static str,
    prefix: &str,
    date: NaiveDate,
) -> DbResult<i64> {
    let pattern = format!("{}-{}-%", prefix, date.format("%Y%m%d"));
    let sql = format!(
        "SELECT COALESCE(MAX(CAST(substr({number_column}, -4) AS INTEGER)), 0) \
         FROM {table} WHERE {number_column} LIKE ?1"
    );
    let highest: i64 = sqlx::query_scalar(&sql)
        .bind(pattern)
        .fetch_one(&mut *conn)
        .await?;
    Ok(highest + 1)
}

/// Today's date, for document numbering.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::repository::inventory::NewMovement;
    use crate::{Database, DbConfig};
    use aquaroute_core::{Customer, CustomerKind, Money, Product, ProductCategory};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// A file database with a real pool, for tests that need several
    /// connections writing at once.
    pub async fn file_db(dir: &tempfile::TempDir) -> Database {
        let config = DbConfig::new(dir.path().join("aquaroute.db")).max_connections(4);
        Database::new(config).await.unwrap()
    }

    pub async fn seed_product(db: &Database, code: &str, price: i64, deposit: bool) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: format!("Producto {code}"),
            description: None,
            category: ProductCategory::Water,
            price: Money::from_minor(price),
            is_active: true,
            affects_bottle_deposit: deposit,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap()
    }

    pub async fn seed_customer(db: &Database, lent: i64, owned: i64) -> Customer {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            code: String::new(),
            tax_id: None,
            name: "Juana Pérez".to_string(),
            kind: CustomerKind::Personal,
            street: "Los Aromos".to_string(),
            street_number: "123".to_string(),
            district: "Maipú".to_string(),
            city: "Santiago".to_string(),
            reference: None,
            phone: Some("+56911112222".to_string()),
            email: None,
            contact: None,
            comments: None,
            bottles_owned: owned,
            bottles_lent: lent,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(customer).await.unwrap()
    }

    pub async fn stock(db: &Database, product_id: &str, quantity: i64) {
        db.inventory()
            .apply_movement(NewMovement::adjustment(product_id, quantity, None, "seed"))
            .await
            .unwrap();
    }
}
