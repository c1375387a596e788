//! # Expense Commands

use tracing::info;

use kedai_core::validation::{validate_name, validate_positive_amount};
use kedai_core::{Actor, Expense, Money};

use super::load_outlet;
use crate::error::ApiResult;
use crate::AppState;

/// Records cash paid out of the drawer.
///
/// The expense is linked to the actor's active session at that outlet, if
/// there is one, and lowers that session's expected cash.
pub async fn record_expense(
    state: &AppState,
    actor: &Actor,
    outlet_id: Option<&str>,
    description: &str,
    amount: Money,
) -> ApiResult<Expense> {
    let description = validate_name("description", description, 200)?;
    validate_positive_amount("amount", amount)?;

    let outlet_id = actor.resolve_outlet(outlet_id)?;
    let outlet = load_outlet(state, &outlet_id).await?;

    let session = state
        .db
        .sessions()
        .find_active(&actor.user_id)
        .await?
        .filter(|s| s.outlet_id == outlet.id);

    let expense = Expense {
        id: uuid::Uuid::new_v4().to_string(),
        outlet_id: outlet.id,
        description,
        amount,
        cashier_id: actor.user_id.clone(),
        cashier_session_id: session.map(|s| s.id),
        created_at: state.now(),
    };
    state.db.expenses().insert(&expense).await?;

    info!(
        id = %expense.id,
        amount = %expense.amount,
        session = ?expense.cashier_session_id,
        "Expense recorded"
    );
    Ok(expense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_session;
    use crate::error::ErrorCode;
    use crate::test_support::{app, cashier};

    #[tokio::test]
    async fn test_linked_to_active_session() {
        let state = app().await;
        let actor = cashier("c1");

        let loose = record_expense(&state, &actor, None, "Sabun cuci", Money::from_units(12_000))
            .await
            .unwrap();
        assert!(loose.cashier_session_id.is_none());

        let session = open_session(&state, &actor, None, Money::zero()).await.unwrap();
        let linked = record_expense(&state, &actor, None, "Es batu", Money::from_units(20_000))
            .await
            .unwrap();
        assert_eq!(linked.cashier_session_id, Some(session.id.clone()));

        let stored = state.db.expenses().list_for_session(&session.id).await.unwrap();
        assert_eq!(stored, vec![linked]);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let state = app().await;
        let actor = cashier("c1");

        let err = record_expense(&state, &actor, None, "Es batu", Money::zero())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = record_expense(&state, &actor, None, "  ", Money::from_units(1_000))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = record_expense(
            &state,
            &actor,
            Some("outlet-2"),
            "Es batu",
            Money::from_units(1_000),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
