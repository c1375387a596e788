//! # Transaction Repository
//!
//! Numbering and persistence of completed sales.
//!
//! ## Checkout Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    commit_checkout (one SQL transaction)                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    ├── conditional decrement per tracked variant                        │
//! │    │     0 rows → StockConflict → ROLLBACK                              │
//! │    ├── INSERT transactions        UNIQUE(number) → UniqueViolation      │
//! │    │     session no longer active → SessionClosed → ROLLBACK          │
//! │    └── INSERT transaction_lines                                         │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Either the sale exists and stock moved, or neither happened.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Numbering
//! `next_sequence` reads `MAX(daily_sequence) + 1` for the outlet code and
//! business date outside the commit. Two tills may read the same value;
//! the UNIQUE index on `number` rejects the second insert and the caller
//! retries with a fresh sequence.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use super::product::apply_decrement;
use crate::error::{DbError, DbResult};
use kedai_core::{
    AppliedDiscount, CartLine, DiscountAudience, Money, OrderChannel, PaymentMethod,
    SessionStatus, StockDecrement, Transaction, TransactionNumber,
};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    number: String,
    business_date: NaiveDate,
    daily_sequence: i64,
    outlet_id: String,
    outlet_name: String,
    channel: String,
    payment_method: PaymentMethod,
    subtotal: i64,
    discount_rule_id: Option<String>,
    discount_rule_name: Option<String>,
    discount_audience: Option<DiscountAudience>,
    discount_amount: i64,
    total: i64,
    amount_tendered: Option<i64>,
    change_amount: Option<i64>,
    cashier_id: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    member_id: Option<String>,
    cashier_session_id: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    transaction_id: String,
    product_id: String,
    product_name: String,
    category_id: String,
    variant_id: String,
    variant_name: String,
    base_price: i64,
    unit_price: i64,
    quantity: i64,
    track_stock: bool,
}

impl From<LineRow> for CartLine {
    fn from(row: LineRow) -> Self {
        CartLine {
            product_id: row.product_id,
            product_name: row.product_name,
            category_id: row.category_id,
            variant_id: row.variant_id,
            variant_name: row.variant_name,
            base_price: Money::from_units(row.base_price),
            unit_price: Money::from_units(row.unit_price),
            quantity: row.quantity,
            track_stock: row.track_stock,
        }
    }
}

impl TransactionRow {
    fn into_transaction(self, lines: Vec<CartLine>) -> DbResult<Transaction> {
        let channel: OrderChannel = self
            .channel
            .parse()
            .map_err(|e| DbError::decode("Transaction", e))?;
        let daily_sequence =
            u32::try_from(self.daily_sequence).map_err(|e| DbError::decode("Transaction", e))?;
        let discount_amount = Money::from_units(self.discount_amount);

        let discount = self.discount_rule_id.map(|rule_id| AppliedDiscount {
            rule_id,
            rule_name: self.discount_rule_name.unwrap_or_default(),
            amount: discount_amount,
            audience: self.discount_audience.unwrap_or_default(),
        });

        Ok(Transaction {
            id: self.id,
            number: self.number,
            business_date: self.business_date,
            daily_sequence,
            lines,
            subtotal: Money::from_units(self.subtotal),
            discount,
            discount_amount,
            total: Money::from_units(self.total),
            created_at: self.created_at,
            outlet_id: self.outlet_id,
            outlet_name: self.outlet_name,
            channel,
            payment_method: self.payment_method,
            amount_tendered: self.amount_tendered.map(Money::from_units),
            change: self.change_amount.map(Money::from_units),
            cashier_id: self.cashier_id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            member_id: self.member_id,
            cashier_session_id: self.cashier_session_id,
        })
    }
}

const TRANSACTION_COLUMNS: &str = r#"
    id, number, business_date, daily_sequence, outlet_id, outlet_name,
    channel, payment_method, subtotal,
    discount_rule_id, discount_rule_name, discount_audience, discount_amount,
    total, amount_tendered, change_amount,
    cashier_id, customer_id, customer_name, member_id, cashier_session_id, created_at
"#;

/// Repository for sales.
///
/// ## Usage
/// ```rust,ignore
/// let seq = repo.next_sequence(&outlet.code(), date).await?;
/// let tx = kedai_core::assemble(&request, &ctx_with(seq))?;
/// repo.commit_checkout(&tx, &kedai_core::decrement_plan(&request.cart)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Next daily sequence for an outlet code on a business date (starts at 1).
    pub async fn next_sequence(&self, outlet_code: &str, business_date: NaiveDate) -> DbResult<u32> {
        let next: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(daily_sequence), 0) + 1
            FROM transactions
            WHERE business_date = ?1 AND outlet_code = ?2
            "#,
        )
        .bind(business_date)
        .bind(outlet_code)
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(next).map_err(|e| DbError::Internal(e.to_string()))
    }

    /// Applies the stock decrements and stores the sale atomically.
    ///
    /// ## Returns
    /// * `Err(DbError::StockConflict)` - a decrement matched no row; nothing was written
    /// * `Err(DbError::UniqueViolation)` on `transactions.number` - the number was taken
    /// * `Err(DbError::SessionClosed)` - the linked session closed before the commit
    /// * `Err(DbError::Busy)` - the write lock was not obtained in time
    pub async fn commit_checkout(
        &self,
        transaction: &Transaction,
        decrements: &[StockDecrement],
    ) -> DbResult<()> {
        debug!(
            number = %transaction.number,
            lines = transaction.lines.len(),
            decrements = decrements.len(),
            "Committing checkout"
        );

        let number: TransactionNumber = transaction
            .number
            .parse()
            .map_err(|e: kedai_core::ValidationError| DbError::Internal(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        for decrement in decrements {
            apply_decrement(&mut tx, decrement).await?;
        }

        let discount = transaction.discount.as_ref();
        let inserted = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, number, business_date, outlet_code, daily_sequence,
                outlet_id, outlet_name, channel, payment_method, subtotal,
                discount_rule_id, discount_rule_name, discount_audience, discount_amount,
                total, amount_tendered, change_amount,
                cashier_id, customer_id, customer_name, member_id,
                cashier_session_id, created_at
            )
            SELECT
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
            WHERE ?22 IS NULL
               OR EXISTS (SELECT 1 FROM cashier_sessions WHERE id = ?22 AND status = ?24)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.number)
        .bind(transaction.business_date)
        .bind(&number.outlet_code)
        .bind(i64::from(transaction.daily_sequence))
        .bind(&transaction.outlet_id)
        .bind(&transaction.outlet_name)
        .bind(transaction.channel.as_str())
        .bind(transaction.payment_method)
        .bind(transaction.subtotal)
        .bind(discount.map(|d| d.rule_id.as_str()))
        .bind(discount.map(|d| d.rule_name.as_str()))
        .bind(discount.map(|d| d.audience))
        .bind(transaction.discount_amount)
        .bind(transaction.total)
        .bind(transaction.amount_tendered)
        .bind(transaction.change)
        .bind(&transaction.cashier_id)
        .bind(&transaction.customer_id)
        .bind(&transaction.customer_name)
        .bind(&transaction.member_id)
        .bind(&transaction.cashier_session_id)
        .bind(transaction.created_at)
        .bind(SessionStatus::Active)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            // dropping `tx` rolls back the decrements above
            return Err(DbError::SessionClosed {
                session_id: transaction.cashier_session_id.clone().unwrap_or_default(),
            });
        }

        for (line_no, line) in transaction.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_lines (
                    transaction_id, line_no, product_id, product_name, category_id,
                    variant_id, variant_name, base_price, unit_price, quantity, track_stock
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&transaction.id)
            .bind(line_no as i64)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(&line.category_id)
            .bind(&line.variant_id)
            .bind(&line.variant_name)
            .bind(line.base_price)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(line.track_stock)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            number = %transaction.number,
            total = %transaction.total,
            payment_method = ?transaction.payment_method,
            "Transaction committed"
        );
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE id = ?1",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(self.with_lines(row.into_iter().collect()).await?.pop())
    }

    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE number = ?1",
            TRANSACTION_COLUMNS
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(self.with_lines(row.into_iter().collect()).await?.pop())
    }

    /// Sales recorded under a cashier session, oldest first.
    pub async fn list_for_session(&self, session_id: &str) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE cashier_session_id = ?1 ORDER BY created_at, number",
            TRANSACTION_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_lines(rows).await
    }

    /// Sales at an outlet from `since` onwards, oldest first.
    pub async fn list_since(
        &self,
        outlet_id: &str,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE outlet_id = ?1 AND created_at >= ?2 ORDER BY created_at, number",
            TRANSACTION_COLUMNS
        ))
        .bind(outlet_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        self.with_lines(rows).await
    }

    /// Sales linked to a customer, oldest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE customer_id = ?1 ORDER BY created_at, number",
            TRANSACTION_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_lines(rows).await
    }

    async fn with_lines(&self, rows: Vec<TransactionRow>) -> DbResult<Vec<Transaction>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT transaction_id, product_id, product_name, category_id, variant_id,
                   variant_name, base_price, unit_price, quantity, track_stock
            FROM transaction_lines WHERE transaction_id IN (
            "#,
        );
        let mut list = query.separated(", ");
        for row in &rows {
            list.push_bind(&row.id);
        }
        list.push_unseparated(") ORDER BY transaction_id, line_no");

        let lines = query.build_query_as::<LineRow>().fetch_all(&self.pool).await?;

        let mut by_transaction: HashMap<String, Vec<CartLine>> = HashMap::new();
        for line in lines {
            by_transaction
                .entry(line.transaction_id.clone())
                .or_default()
                .push(line.into());
        }

        rows.into_iter()
            .map(|row| {
                let lines = by_transaction.remove(&row.id).unwrap_or_default();
                row.into_transaction(lines)
            })
            .collect()
    }
}
