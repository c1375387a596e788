//! # Cashier Session Commands
//!
//! Opening and closing the cash drawer. Reconciliation reads the
//! transactions and expenses linked to the session by id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use kedai_core::session::summarize;
use kedai_core::{Actor, CashierRef, CashierSession, CoreError, Money, SessionSummary};

use super::load_outlet;
use crate::error::ApiResult;
use crate::AppState;

/// A session with its reconciliation figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSummary {
    pub session: CashierSession,
    pub summary: SessionSummary,
}

/// Opens a drawer session for the actor at their outlet (owners may name
/// another one).
pub async fn open_session(
    state: &AppState,
    actor: &Actor,
    outlet_id: Option<&str>,
    initial_cash: Money,
) -> ApiResult<CashierSession> {
    debug!(cashier_id = %actor.user_id, initial_cash = %initial_cash, "open_session command");

    let outlet_id = actor.resolve_outlet(outlet_id)?;
    let outlet = load_outlet(state, &outlet_id).await?;

    let cashier = CashierRef {
        id: actor.user_id.clone(),
        name: actor.name.clone(),
    };
    let session = kedai_core::open_session(&cashier, &outlet, initial_cash, state.now())?;

    match state.db.sessions().open(&session).await {
        Ok(()) => Ok(session),
        Err(err) if err.is_unique_violation_on("cashier_id") => {
            Err(CoreError::SessionAlreadyActive {
                cashier_id: actor.user_id.clone(),
            }
            .into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Closes the actor's active session against the counted cash.
///
/// A variance is recorded, never rejected.
pub async fn close_session(
    state: &AppState,
    actor: &Actor,
    counted_cash: Money,
) -> ApiResult<ShiftSummary> {
    debug!(cashier_id = %actor.user_id, counted_cash = %counted_cash, "close_session command");

    let session = state
        .db
        .sessions()
        .find_active(&actor.user_id)
        .await?
        .ok_or_else(|| CoreError::NoActiveSession {
            cashier_id: actor.user_id.clone(),
        })?;

    let transactions = state.db.transactions().list_for_session(&session.id).await?;
    let expenses = state.db.expenses().list_for_session(&session.id).await?;

    let (closed, summary) = kedai_core::close_session(
        &session,
        &transactions,
        &expenses,
        counted_cash,
        state.now(),
    )?;

    if !state.db.sessions().close(&closed).await? {
        warn!(id = %session.id, "Session was closed concurrently");
        return Err(CoreError::InvalidSessionStatus {
            session_id: session.id,
            current_status: "closed".to_string(),
        }
        .into());
    }

    if closed.variance.is_some_and(|v| !v.is_zero()) {
        warn!(
            id = %closed.id,
            cashier_id = %closed.cashier_id,
            variance = ?closed.variance,
            "Drawer closed with a variance"
        );
    }
    info!(
        id = %closed.id,
        transactions = summary.transaction_count,
        expected = %summary.expected_cash,
        "Shift closed"
    );

    Ok(ShiftSummary {
        session: closed,
        summary,
    })
}

/// Current figures for a session. Cashiers only see their own.
pub async fn session_summary(
    state: &AppState,
    actor: &Actor,
    session_id: &str,
) -> ApiResult<ShiftSummary> {
    let session = state
        .db
        .sessions()
        .get_by_id(session_id)
        .await?
        .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;

    if !actor.can_view_session_of(&session.cashier_id) {
        return Err(CoreError::Forbidden {
            action: "view another cashier's session".to_string(),
        }
        .into());
    }

    let transactions = state.db.transactions().list_for_session(&session.id).await?;
    let expenses = state.db.expenses().list_for_session(&session.id).await?;
    let summary = summarize(&session, &transactions, &expenses);

    Ok(ShiftSummary { session, summary })
}

/// Sessions at an outlet started from `since`, newest first, limited to
/// the ones the actor may see.
pub async fn list_sessions(
    state: &AppState,
    actor: &Actor,
    outlet_id: Option<&str>,
    since: DateTime<Utc>,
) -> ApiResult<Vec<CashierSession>> {
    let outlet_id = actor.resolve_outlet(outlet_id)?;
    let sessions = state.db.sessions().list_for_outlet(&outlet_id, since).await?;

    Ok(sessions
        .into_iter()
        .filter(|s| actor.can_view_session_of(&s.cashier_id))
        .collect())
}
