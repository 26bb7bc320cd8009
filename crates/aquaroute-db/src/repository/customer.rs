//! # Customer Repository
//!
//! Customer CRUD, search and the `CLI001` code sequence.
//!
//! ## Customer Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kind = business ──► tax_id required, must be a well-formed RUT        │
//! │  kind = personal ──► tax_id optional, blank stored as NULL             │
//! │  code            ──► assigned on insert: highest CLInnn + 1            │
//! │  bottles_lent    ──► moved only by route completion (floored at 0)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use aquaroute_core::validation::{
    next_customer_code, validate_count, validate_customer_tax_id, validate_email,
    validate_search_query, validate_text,
};
use aquaroute_core::{BottleSnapshot, Customer, CUSTOMER_CODE_PREFIX};

const COLUMNS: &str = "id, code, tax_id, name, kind, street, street_number, district, city, \
                       reference, phone, email, contact, comments, bottles_owned, bottles_lent, \
                       created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

/// Normalizes and checks the editable fields of a customer.
fn validated(mut customer: Customer) -> DbResult<Customer> {
    customer.name = validate_text("name", &customer.name, 120)?;
    customer.street = validate_text("street", &customer.street, 120)?;
    customer.street_number = validate_text("street_number", &customer.street_number, 20)?;
    customer.district = validate_text("district", &customer.district, 80)?;
    customer.city = validate_text("city", &customer.city, 80)?;
    customer.tax_id = validate_customer_tax_id(customer.kind, customer.tax_id.as_deref())?;
    customer.email = match customer.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => Some(validate_email(email)?),
        _ => None,
    };
    validate_count("bottles_owned", customer.bottles_owned)?;
    validate_count("bottles_lent", customer.bottles_lent)?;
    Ok(customer)
}

/// Moves a customer's live `bottles_lent` by `delta`, never below zero.
pub(crate) async fn adjust_bottles_lent(
    conn: &mut SqliteConnection,
    customer_id: &str,
    delta: i64,
) -> DbResult<i64> {
    let lent: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE customers
        SET bottles_lent = MAX(bottles_lent + ?2, 0),
            updated_at = ?3
        WHERE id = ?1
        RETURNING bottles_lent
        "#,
    )
    .bind(customer_id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    lent.ok_or_else(|| DbError::not_found("Customer", customer_id))
}

/// The customer's bottle counters as they stand inside `conn`'s transaction.
pub(crate) async fn bottle_snapshot(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<BottleSnapshot> {
    let row: Option<(i64, i64)> =
        sqlx::query_as("SELECT bottles_lent, bottles_owned FROM customers WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(|(in_circulation, owned)| BottleSnapshot {
        in_circulation,
        owned,
    })
    .ok_or_else(|| DbError::not_found("Customer", customer_id))
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// All customers by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {COLUMNS} FROM customers ORDER BY name");
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    /// Case-insensitive match on name, code or RUT. Empty query lists all.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let query = validate_search_query(query)?;
        debug!(query = %query, limit, "Searching customers");

        if query.is_empty() {
            let sql = format!("SELECT {COLUMNS} FROM customers ORDER BY name LIMIT ?1");
            return Ok(sqlx::query_as::<_, Customer>(&sql)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?);
        }

        let pattern = format!("%{}%", query.to_lowercase());
        let sql = format!(
            "SELECT {COLUMNS} FROM customers \
             WHERE lower(name) LIKE ?1 OR lower(code) LIKE ?1 OR lower(COALESCE(tax_id, '')) LIKE ?1 \
             ORDER BY name LIMIT ?2"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = customers.len(), "Customer search returned");
        Ok(customers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Code the next inserted customer will receive.
    pub async fn next_code(&self) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        next_code(&mut *conn).await
    }

    /// Validates, assigns the next `CLInnn` code and inserts.
    ///
    /// Any `code` on the input is ignored.
    pub async fn insert(&self, customer: Customer) -> DbResult<Customer> {
        let mut customer = validated(customer)?;

        let mut tx = begin_write(&self.pool).await?;
        customer.code = next_code(&mut *tx).await?;

        debug!(code = %customer.code, kind = ?customer.kind, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, code, tax_id, name, kind, street, street_number, district, city,
                reference, phone, email, contact, comments, bottles_owned, bottles_lent,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.code)
        .bind(&customer.tax_id)
        .bind(&customer.name)
        .bind(customer.kind)
        .bind(&customer.street)
        .bind(&customer.street_number)
        .bind(&customer.district)
        .bind(&customer.city)
        .bind(&customer.reference)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.contact)
        .bind(&customer.comments)
        .bind(customer.bottles_owned)
        .bind(customer.bottles_lent)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("tax_id") => {
                DbError::duplicate("tax_id", customer.tax_id.clone().unwrap_or_default())
            }
            other => other,
        })?;

        tx.commit().await?;
        Ok(customer)
    }

    /// Updates every editable field. The code is never changed.
    pub async fn update(&self, customer: Customer) -> DbResult<Customer> {
        let customer = validated(customer)?;
        debug!(id = %customer.id, "Updating customer");

        let sql = format!(
            r#"
            UPDATE customers SET
                tax_id = ?2, name = ?3, kind = ?4, street = ?5, street_number = ?6,
                district = ?7, city = ?8, reference = ?9, phone = ?10, email = ?11,
                contact = ?12, comments = ?13, bottles_owned = ?14, bottles_lent = ?15,
                updated_at = ?16
            WHERE id = ?1
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, Customer>(&sql)
            .bind(&customer.id)
            .bind(&customer.tax_id)
            .bind(&customer.name)
            .bind(customer.kind)
            .bind(&customer.street)
            .bind(&customer.street_number)
            .bind(&customer.district)
            .bind(&customer.city)
            .bind(&customer.reference)
            .bind(&customer.phone)
            .bind(&customer.email)
            .bind(&customer.contact)
            .bind(&customer.comments)
            .bind(customer.bottles_owned)
            .bind(customer.bottles_lent)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", &customer.id))
    }

    /// Deletes a customer with no orders or routes.
    ///
    /// ## Errors
    /// `ForeignKeyViolation` when sales or routes still reference it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        Ok(())
    }
}

async fn next_code(conn: &mut SqliteConnection) -> DbResult<String> {
    let latest: Option<String> = sqlx::query_scalar(
        r#"
        SELECT code FROM customers
        WHERE code LIKE ?1
        ORDER BY length(code) DESC, code DESC
        LIMIT 1
        "#,
    )
    .bind(format!("{CUSTOMER_CODE_PREFIX}%"))
    .fetch_optional(&mut *conn)
    .await?;

    Ok(next_customer_code(latest.as_deref()))
}

/// Helper to generate a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}
