//! # Customer Repository
//!
//! Customers are keyed by normalized phone number. A sale can be linked to
//! a customer after the fact ("who was this for?"), which also bumps the
//! customer's running totals.
//!
//! ## Linking a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                link_to_transaction (one SQL transaction)                │
//! │                                                                         │
//! │  upsert customer by phone ──► read the sale                             │
//! │                                 ├── missing        → NotFound           │
//! │                                 ├── has customer   → AlreadyLinked      │
//! │                                 └── unlinked                            │
//! │                                       ├── set customer on the sale      │
//! │                                       └── total_spent += total          │
//! │                                           last_transaction_at = max     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kedai_core::{Customer, Money};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    phone: String,
    member_id: Option<String>,
    total_spent: i64,
    last_transaction_at: Option<DateTime<Utc>>,
}

impl CustomerRow {
    fn into_customer(self, transaction_ids: Vec<String>) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
            phone: self.phone,
            total_spent: Money::from_units(self.total_spent),
            last_transaction_at: self.last_transaction_at,
            transaction_ids,
            member_id: self.member_id,
        }
    }
}

const CUSTOMER_COLUMNS: &str = "id, name, phone, member_id, total_spent, last_transaction_at";

/// Result of linking a sale to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked(Customer),
    /// The sale already had a customer; nothing changed.
    AlreadyLinked,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer. `transaction_ids` is derived and ignored here.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - phone or member id already registered
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, member_id, total_spent, last_transaction_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.member_id)
        .bind(customer.total_spent)
        .bind(customer.last_transaction_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        self.find_one("id", id).await
    }

    /// Lookup by normalized phone.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        self.find_one("phone", phone).await
    }

    /// Lookup by scanned member code.
    pub async fn get_by_member_id(&self, member_id: &str) -> DbResult<Option<Customer>> {
        self.find_one("member_id", member_id).await
    }

    /// All customers, biggest spenders first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers ORDER BY total_spent DESC, name",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut customers = Vec::with_capacity(rows.len());
        for row in rows {
            let ids = transaction_ids(&self.pool, &row.id).await?;
            customers.push(row.into_customer(ids));
        }
        Ok(customers)
    }

    /// Links an unlinked sale to the customer with `phone`, creating the
    /// customer when the phone is new.
    ///
    /// `phone` must already be normalized.
    ///
    /// ## Returns
    /// * `Ok(LinkOutcome::Linked(customer))` - with updated totals
    /// * `Ok(LinkOutcome::AlreadyLinked)` - the sale had a customer; nothing written
    /// * `Err(DbError::NotFound)` - no such sale
    pub async fn link_to_transaction(
        &self,
        transaction_id: &str,
        name: &str,
        phone: &str,
    ) -> DbResult<LinkOutcome> {
        debug!(transaction_id = %transaction_id, "Linking customer to transaction");

        let mut tx = self.pool.begin().await?;

        // Writing first takes the write lock before anything is read.
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, total_spent, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            ON CONFLICT(phone) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(phone)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let customer_id: String = sqlx::query_scalar("SELECT id FROM customers WHERE phone = ?1")
            .bind(phone)
            .fetch_one(&mut *tx)
            .await?;

        let sale: Option<(Option<String>, i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT customer_id, total, created_at FROM transactions WHERE id = ?1",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (total, sold_at) = match sale {
            None => return Err(DbError::not_found("Transaction", transaction_id)),
            Some((Some(_), _, _)) => {
                tx.rollback().await?;
                return Ok(LinkOutcome::AlreadyLinked);
            }
            Some((None, total, sold_at)) => (total, sold_at),
        };

        let result = sqlx::query(
            r#"
            UPDATE transactions SET customer_id = ?2, customer_name = ?3
            WHERE id = ?1 AND customer_id IS NULL
            "#,
        )
        .bind(transaction_id)
        .bind(&customer_id)
        .bind(name)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(LinkOutcome::AlreadyLinked);
        }

        sqlx::query(
            r#"
            UPDATE customers SET
                total_spent = total_spent + ?2,
                last_transaction_at = CASE
                    WHEN last_transaction_at IS NULL OR last_transaction_at < ?3 THEN ?3
                    ELSE last_transaction_at
                END
            WHERE id = ?1
            "#,
        )
        .bind(&customer_id)
        .bind(total)
        .bind(sold_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            transaction_id = %transaction_id,
            customer_id = %customer_id,
            "Customer linked to transaction"
        );

        self.get_by_id(&customer_id)
            .await?
            .map(LinkOutcome::Linked)
            .ok_or_else(|| DbError::not_found("Customer", customer_id))
    }

    async fn find_one(&self, column: &str, value: &str) -> DbResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE {} = ?1",
            CUSTOMER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let ids = transaction_ids(&self.pool, &row.id).await?;
                Ok(Some(row.into_customer(ids)))
            }
            None => Ok(None),
        }
    }
}

/// Ids of the sales linked to a customer, oldest first.
async fn transaction_ids<'e, E>(executor: E, customer_id: &str) -> DbResult<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids = sqlx::query_scalar(
        "SELECT id FROM transactions WHERE customer_id = ?1 ORDER BY created_at, number",
    )
    .bind(customer_id)
    .fetch_all(executor)
    .await?;

    Ok(ids)
}
