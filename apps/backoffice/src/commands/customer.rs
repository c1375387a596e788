//! # Customer Commands
//!
//! Backfilling a customer onto a finished sale, and member QR lookup.

use tracing::debug;

use kedai_core::validation::{normalize_phone, validate_name};
use kedai_core::{Actor, CoreError, Customer, MemberIdentity};
use kedai_db::{DbError, LinkOutcome};

use crate::error::ApiResult;
use crate::AppState;

/// Attaches a customer (found or created by phone) to a sale that has none.
///
/// The customer's spend and last visit are updated in the same write.
/// Cashiers may only link sales from their own outlet.
pub async fn link_customer(
    state: &AppState,
    actor: &Actor,
    transaction_id: &str,
    name: &str,
    phone: &str,
) -> ApiResult<Customer> {
    debug!(transaction_id = %transaction_id, "link_customer command");

    let name = validate_name("name", name, 100)?;
    let phone = normalize_phone(phone)?;

    let sale = state
        .db
        .transactions()
        .get_by_id(transaction_id)
        .await?
        .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;
    actor.resolve_outlet(Some(&sale.outlet_id))?;

    let outcome = match state
        .db
        .customers()
        .link_to_transaction(transaction_id, &name, &phone)
        .await
    {
        Ok(outcome) => outcome,
        Err(DbError::NotFound { .. }) => {
            return Err(CoreError::TransactionNotFound(transaction_id.to_string()).into())
        }
        Err(err) => return Err(err.into()),
    };

    match outcome {
        LinkOutcome::Linked(customer) => Ok(customer),
        LinkOutcome::AlreadyLinked => Err(CoreError::CustomerAlreadyLinked {
            transaction_id: transaction_id.to_string(),
        }
        .into()),
    }
}

/// Looks up a scanned member code.
pub async fn validate_member(state: &AppState, member_id: &str) -> ApiResult<MemberIdentity> {
    let member_id = member_id.trim();
    let member = state
        .db
        .customers()
        .get_by_member_id(member_id)
        .await?
        .and_then(|customer| customer.member_identity())
        .ok_or_else(|| CoreError::MemberNotFound(member_id.to_string()))?;
    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::checkout::{checkout, CheckoutInput, CheckoutItem};
    use crate::commands::open_session;
    use crate::error::ErrorCode;
    use crate::test_support::{app, cashier, noon};
    use kedai_core::{Money, PaymentMethod, Transaction};

    async fn teh_sale(state: &AppState, quantity: i64) -> Transaction {
        checkout(
            state,
            &cashier("c1"),
            CheckoutInput {
                outlet_id: None,
                channel: None,
                items: vec![CheckoutItem {
                    product_id: "teh".to_string(),
                    variant_id: "teh-reg".to_string(),
                    quantity,
                }],
                payment_method: PaymentMethod::Qris,
                amount_tendered: None,
                member_id: None,
                customer_name: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_link_accumulates_spend() {
        let state = app().await;
        open_session(&state, &cashier("c1"), None, Money::zero()).await.unwrap();
        let first = teh_sale(&state, 1).await;
        let second = teh_sale(&state, 3).await;

        let customer = link_customer(&state, &cashier("c1"), &first.id, "Dewi", "0812-3456-7890")
            .await
            .unwrap();
        assert_eq!(customer.phone, "6281234567890");
        assert_eq!(customer.total_spent, Money::from_units(8_000));

        let customer =
            link_customer(&state, &cashier("c1"), &second.id, "Dewi S", "+62 812 3456 7890")
                .await
                .unwrap();
        assert_eq!(customer.total_spent, Money::from_units(32_000));
        assert_eq!(customer.name, "Dewi S");
        assert_eq!(customer.last_transaction_at, Some(noon()));
        assert_eq!(customer.transaction_ids.len(), 2);

        let stored = state.db.transactions().get_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.customer_id, Some(customer.id));
    }

    #[tokio::test]
    async fn test_link_is_one_shot() {
        let state = app().await;
        open_session(&state, &cashier("c1"), None, Money::zero()).await.unwrap();
        let sale = teh_sale(&state, 1).await;

        link_customer(&state, &cashier("c1"), &sale.id, "Dewi", "081234567890")
            .await
            .unwrap();
        let err = link_customer(&state, &cashier("c1"), &sale.id, "Budi", "081298765432")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_link_rejects_bad_input() {
        let state = app().await;

        let err = link_customer(&state, &cashier("c1"), "missing", "Dewi", "081234567890")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = link_customer(&state, &cashier("c1"), "missing", "Dewi", "12")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_validate_member() {
        let state = app().await;
        state
            .db
            .customers()
            .insert(&Customer {
                id: "cust-1".to_string(),
                name: "Dewi".to_string(),
                phone: "6281234567890".to_string(),
                total_spent: Money::zero(),
                last_transaction_at: None,
                transaction_ids: Vec::new(),
                member_id: Some("M-001".to_string()),
            })
            .await
            .unwrap();

        let member = validate_member(&state, " M-001 ").await.unwrap();
        assert_eq!(member.customer_id, "cust-1");

        let err = validate_member(&state, "M-404").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
