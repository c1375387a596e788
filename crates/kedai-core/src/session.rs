//! # Cashier Sessions
//!
//! Opening and reconciling a cash drawer.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   open_session(initial_cash)          close_session(counted_cash)       │
//! │   ─────────────────────────►  ACTIVE  ──────────────────────────► CLOSED│
//! │                                                                         │
//! │   expected = initial_cash + Σ cash sales − Σ expenses                  │
//! │   variance = counted_cash − expected        (recorded, never rejected) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only transactions and expenses carrying the session's id are counted;
//! the caller selects them by `cashier_session_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CashierSession, Expense, Outlet, SessionStatus, Transaction};
use crate::validation::validate_price;

/// Who is opening the drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashierRef {
    pub id: String,
    pub name: String,
}

/// Opens a new drawer session.
///
/// Uniqueness of the active session per cashier is enforced by storage.
pub fn open_session(
    cashier: &CashierRef,
    outlet: &Outlet,
    initial_cash: Money,
    now: DateTime<Utc>,
) -> CoreResult<CashierSession> {
    validate_price("initial_cash", initial_cash)?;

    Ok(CashierSession {
        id: uuid::Uuid::new_v4().to_string(),
        cashier_id: cashier.id.clone(),
        cashier_name: cashier.name.clone(),
        outlet_id: outlet.id.clone(),
        outlet_name: outlet.name.clone(),
        started_at: now,
        initial_cash,
        status: SessionStatus::Active,
        ended_at: None,
        counted_cash: None,
        expected_cash: None,
        variance: None,
    })
}

/// Breakdown shown on the closing screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSummary {
    pub initial_cash: Money,
    pub cash_sales: Money,
    pub non_cash_sales: Money,
    pub expense_total: Money,
    pub transaction_count: u32,
    pub expected_cash: Money,
}

/// Totals for a session from its linked transactions and expenses.
pub fn summarize(
    session: &CashierSession,
    transactions: &[Transaction],
    expenses: &[Expense],
) -> SessionSummary {
    let (cash, non_cash): (Vec<&Transaction>, Vec<&Transaction>) = transactions
        .iter()
        .partition(|tx| tx.payment_method.is_cash());

    let cash_sales: Money = cash.iter().map(|tx| tx.total).sum();
    let non_cash_sales: Money = non_cash.iter().map(|tx| tx.total).sum();
    let expense_total: Money = expenses.iter().map(|e| e.amount).sum();

    SessionSummary {
        initial_cash: session.initial_cash,
        cash_sales,
        non_cash_sales,
        expense_total,
        transaction_count: transactions.len() as u32,
        expected_cash: session.initial_cash + cash_sales - expense_total,
    }
}

/// Closes a session and records the reconciliation.
///
/// A non-zero variance is recorded, not rejected.
///
/// ## Errors
/// - `InvalidSessionStatus` if the session is already closed
/// - `Validation` for a negative counted amount
pub fn close_session(
    session: &CashierSession,
    transactions: &[Transaction],
    expenses: &[Expense],
    counted_cash: Money,
    now: DateTime<Utc>,
) -> CoreResult<(CashierSession, SessionSummary)> {
    if session.status != SessionStatus::Active {
        return Err(CoreError::InvalidSessionStatus {
            session_id: session.id.clone(),
            current_status: "closed".to_string(),
        });
    }
    validate_price("counted_cash", counted_cash)?;

    let summary = summarize(session, transactions, expenses);

    let mut closed = session.clone();
    closed.status = SessionStatus::Closed;
    closed.ended_at = Some(now);
    closed.counted_cash = Some(counted_cash);
    closed.expected_cash = Some(summary.expected_cash);
    closed.variance = Some(counted_cash - summary.expected_cash);

    Ok((closed, summary))
}

// =============================================================================
// Unit Tests
// =============================================================================
