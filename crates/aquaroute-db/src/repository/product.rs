//! # Product Repository
//!
//! Catalog CRUD. Products are deactivated, never deleted: sold lines and
//! movements keep pointing at them.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use aquaroute_core::validation::{validate_price, validate_product_code, validate_text};
use aquaroute_core::Product;

const COLUMNS: &str = "id, code, name, description, category, price, is_active, \
                       affects_bottle_deposit, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let refill = db.products().get_by_code("BID-20L").await?;
/// let catalog = db.products().list(true).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products by name. `active_only` hides deactivated ones.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Product>> {
        let sql = if active_only {
            format!("SELECT {COLUMNS} FROM products WHERE is_active = 1 ORDER BY name")
        } else {
            format!("SELECT {COLUMNS} FROM products ORDER BY name")
        };
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), active_only, "Listed products");
        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Like [`get_by_id`](Self::get_by_id) but missing is an error.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE code = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Inserts a product after validating code, name and price.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        let mut product = product.clone();
        product.code = validate_product_code(&product.code)?;
        product.name = validate_text("name", &product.name, 120)?;
        validate_price(product.price)?;

        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, description, category, price,
                is_active, affects_bottle_deposit, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category)
        .bind(product.price)
        .bind(product.is_active)
        .bind(product.affects_bottle_deposit)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.code),
            other => other,
        })?;

        Ok(product)
    }

    /// Updates every editable field of a product.
    ///
    /// Price changes only affect future carts; sold lines keep their price.
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        let code = validate_product_code(&product.code)?;
        let name = validate_text("name", &product.name, 120)?;
        validate_price(product.price)?;

        debug!(id = %product.id, "Updating product");

        let sql = format!(
            r#"
            UPDATE products SET
                code = ?2,
                name = ?3,
                description = ?4,
                category = ?5,
                price = ?6,
                is_active = ?7,
                affects_bottle_deposit = ?8,
                updated_at = ?9
            WHERE id = ?1
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(&product.id)
            .bind(&code)
            .bind(&name)
            .bind(&product.description)
            .bind(product.category)
            .bind(product.price)
            .bind(product.is_active)
            .bind(product.affects_bottle_deposit)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Sets is_active = false.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_product, test_db};
    use aquaroute_core::Money;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let product = seed_product(&db, "bid-20l", 2500, true).await;

        // Codes are normalized on insert
        assert_eq!(product.code, "BID-20L");
        let found = db.products().get_by_code("BID-20L").await.unwrap().unwrap();
        assert_eq!(found.id, product.id);
        assert!(found.affects_bottle_deposit);
        assert_eq!(found.price, Money::from_minor(2500));
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let db = test_db().await;
        let product = seed_product(&db, "BID-20L", 2500, true).await;

        let mut copy = product.clone();
        copy.id = generate_product_id();
        let err = db.products().insert(&copy).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_and_deactivate() {
        let db = test_db().await;
        let mut product = seed_product(&db, "DISP-01", 9000, false).await;

        product.price = Money::from_minor(9500);
        let updated = db.products().update(&product).await.unwrap();
        assert_eq!(updated.price.minor(), 9500);

        db.products().deactivate(&product.id).await.unwrap();
        assert!(db.products().list(true).await.unwrap().is_empty());
        assert_eq!(db.products().list(false).await.unwrap().len(), 1);
        assert!(matches!(
            db.products().deactivate("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let db = test_db().await;
        let mut product = seed_product(&db, "DISP-01", 9000, false).await;
        product.price = Money::from_minor(-1);
        assert!(matches!(
            db.products().update(&product).await,
            Err(DbError::Core(_))
        ));
    }
}
