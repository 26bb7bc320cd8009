//! # Expense Repository
//!
//! Outgoing payments, read back by the financial summary.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use aquaroute_core::validation::{validate_amount, validate_text};
use aquaroute_core::{Expense, Money};

const COLUMNS: &str = "id, category, amount, description, expense_date, created_by, created_at";

/// An expense as entered on the finance screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub category: String,
    pub amount: Money,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Validates and stores an expense. Categories are kept lower-case so
    /// "Fuel" and "fuel" group together.
    pub async fn record(&self, expense: NewExpense, actor_id: &str) -> DbResult<Expense> {
        let category = validate_text("category", &expense.category, 60)?.to_lowercase();
        validate_amount(expense.amount)?;

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            category,
            amount: expense.amount,
            description: expense
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            expense_date: expense.expense_date,
            created_by: actor_id.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, category, amount, description, expense_date, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.category)
        .bind(expense.amount)
        .bind(&expense.description)
        .bind(expense.expense_date)
        .bind(&expense.created_by)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        info!(category = %expense.category, amount = %expense.amount, actor = %actor_id, "Expense recorded");
        Ok(expense)
    }

    /// Expenses dated within `[from, to]`, oldest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM expenses WHERE expense_date >= ?1 AND expense_date <= ?2 \
             ORDER BY expense_date, created_at"
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        debug!(from = %from, to = %to, count = expenses.len(), "Listed expenses");
        Ok(expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use crate::DbError;
    use aquaroute_core::CoreError;

    fn fuel(day: u32, amount: i64) -> NewExpense {
        NewExpense {
            category: " Fuel ".to_string(),
            amount: Money::from_minor(amount),
            description: Some("  ".to_string()),
            expense_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_record_normalizes() {
        let db = test_db().await;
        let saved = db.expenses().record(fuel(1, 15_000), "u-admin").await.unwrap();
        assert_eq!(saved.category, "fuel");
        assert!(saved.description.is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let db = test_db().await;
        let err = db.expenses().record(fuel(1, 0), "u-admin").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_between_is_inclusive() {
        let db = test_db().await;
        for day in [1, 5, 10] {
            db.expenses().record(fuel(day, 1_000), "u-admin").await.unwrap();
        }

        let from = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let listed = db.expenses().list_between(from, to).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].expense_date, from);
    }
}
