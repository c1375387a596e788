//! # Expense Repository
//!
//! Cash paid out of the drawer. Expenses reduce the expected cash of the
//! session they are linked to.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kedai_core::{Expense, SessionStatus};

const EXPENSE_COLUMNS: &str =
    "id, outlet_id, description, amount, cashier_id, cashier_session_id, created_at";

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Stores an expense.
    ///
    /// ## Returns
    /// * `Err(DbError::SessionClosed)` - the linked session is no longer active
    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        debug!(
            id = %expense.id,
            amount = %expense.amount,
            session = ?expense.cashier_session_id,
            "Recording expense"
        );

        let inserted = sqlx::query(
            r#"
            INSERT INTO expenses (
                id, outlet_id, description, amount, cashier_id, cashier_session_id, created_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
            WHERE ?6 IS NULL
               OR EXISTS (SELECT 1 FROM cashier_sessions WHERE id = ?6 AND status = ?8)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.outlet_id)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.cashier_id)
        .bind(&expense.cashier_session_id)
        .bind(expense.created_at)
        .bind(SessionStatus::Active)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DbError::SessionClosed {
                session_id: expense.cashier_session_id.clone().unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Expenses linked to a cashier session, oldest first.
    pub async fn list_for_session(&self, session_id: &str) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM expenses WHERE cashier_session_id = ?1 ORDER BY created_at",
            EXPENSE_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Expenses at an outlet from `since` onwards, oldest first.
    pub async fn list_since(&self, outlet_id: &str, since: DateTime<Utc>) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM expenses WHERE outlet_id = ?1 AND created_at >= ?2 ORDER BY created_at",
            EXPENSE_COLUMNS
        ))
        .bind(outlet_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, noon, outlet};
    use chrono::Duration;
    use kedai_core::{close_session, open_session, CashierRef, Money};

    fn expense(id: &str, amount: i64, session: Option<&str>, at: DateTime<Utc>) -> Expense {
        Expense {
            id: id.to_string(),
            outlet_id: "outlet-1".to_string(),
            description: "Es batu".to_string(),
            amount: Money::from_units(amount),
            cashier_id: "c1".to_string(),
            cashier_session_id: session.map(str::to_string),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_list_for_session_and_since() {
        let db = memory_db().await;
        let cashier = CashierRef {
            id: "c1".to_string(),
            name: "Sari".to_string(),
        };
        let session = open_session(&cashier, &outlet(), Money::zero(), noon()).unwrap();
        db.sessions().open(&session).await.unwrap();

        let linked = expense("e1", 20_000, Some(&session.id), noon());
        let loose = expense("e2", 5_000, None, noon() + Duration::minutes(5));
        db.expenses().insert(&linked).await.unwrap();
        db.expenses().insert(&loose).await.unwrap();

        let for_session = db.expenses().list_for_session(&session.id).await.unwrap();
        assert_eq!(for_session, vec![linked.clone()]);

        let since = db.expenses().list_since("outlet-1", noon()).await.unwrap();
        assert_eq!(since, vec![linked, loose]);
    }

    #[tokio::test]
    async fn test_expense_against_closed_session_rejected() {
        let db = memory_db().await;
        let cashier = CashierRef {
            id: "c1".to_string(),
            name: "Sari".to_string(),
        };
        let session = open_session(&cashier, &outlet(), Money::from_units(500_000), noon()).unwrap();
        db.sessions().open(&session).await.unwrap();

        let seen = db.sessions().find_active("c1").await.unwrap().unwrap();
        let (closed, _) =
            close_session(&session, &[], &[], Money::from_units(500_000), noon()).unwrap();
        assert!(db.sessions().close(&closed).await.unwrap());

        let err = db
            .expenses()
            .insert(&expense("e4", 20_000, Some(&seen.id), noon()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::SessionClosed { ref session_id } if *session_id == seen.id));
        assert!(db.expenses().list_for_session(&seen.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_by_schema() {
        let db = memory_db().await;
        let err = db
            .expenses()
            .insert(&expense("e3", 0, None, noon()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(_)));
    }
}
