//! # Checkout Commands
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Resolve outlet ─────── cashiers are pinned to their home outlet     │
//! │  2. Active session ─────── required unless checkout.require_open_session│
//! │  3. Build cart ─────────── channel prices from the PriceBook            │
//! │  4. Resolve member ─────── scanned member code → customer               │
//! │  5. Best discount ──────── one rule, highest amount                     │
//! │  6. Commit loop (bounded)                                               │
//! │       snapshot → check_availability → next_sequence → assemble          │
//! │       → commit_checkout (stock decrement + insert, one SQL tx)          │
//! │       stock conflict / number collision / busy ──► try again            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use kedai_core::{
    apply_discount, assemble, business_date, check_availability, decrement_plan,
    select_best_discount, Actor, AppliedDiscount, Cart, CheckoutContext, CheckoutRequest,
    CoreError, MemberIdentity, Money, OrderChannel, Outlet, PaymentMethod, Transaction,
};
use kedai_db::DbError;

use super::load_outlet;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
}

/// A checkout as submitted by the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    /// Only owners may pick an outlet other than their own.
    #[serde(default)]
    pub outlet_id: Option<String>,
    /// `in_store` when absent.
    #[serde(default)]
    pub channel: Option<String>,
    pub items: Vec<CheckoutItem>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub amount_tendered: Option<Money>,
    /// Scanned member code.
    #[serde(default)]
    pub member_id: Option<String>,
    /// Walk-in customer name for the receipt.
    #[serde(default)]
    pub customer_name: Option<String>,
}

/// Prices and the best discount for a cart, without selling anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPreview {
    pub cart: Cart,
    pub discount: Option<AppliedDiscount>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// Everything a checkout needs before the commit loop.
struct PreparedCheckout {
    outlet: Outlet,
    cart: Cart,
    member: Option<MemberIdentity>,
    discount: Option<AppliedDiscount>,
}

async fn prepare(
    state: &AppState,
    actor: &Actor,
    input: &CheckoutInput,
    now: DateTime<Utc>,
) -> ApiResult<PreparedCheckout> {
    let outlet_id = actor.resolve_outlet(input.outlet_id.as_deref())?;
    let outlet = load_outlet(state, &outlet_id).await?;

    let channel = match input.channel.as_deref() {
        Some(slug) => slug.parse::<OrderChannel>()?,
        None => OrderChannel::InStore,
    };
    let cart = build_cart(state, &outlet, channel, &input.items).await?;
    let member = resolve_member(state, input.member_id.as_deref()).await?;

    let rules = state.db.discount_rules().list_active().await?;
    let discount = select_best_discount(&cart, member.is_some(), &rules, cart.subtotal(), now);

    Ok(PreparedCheckout {
        outlet,
        cart,
        member,
        discount,
    })
}

pub(crate) async fn build_cart(
    state: &AppState,
    outlet: &Outlet,
    channel: OrderChannel,
    items: &[CheckoutItem],
) -> ApiResult<Cart> {
    let mut ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
    ids.sort_unstable();
    ids.dedup();

    let products: HashMap<String, _> = state
        .db
        .products()
        .get_many(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut cart = Cart::new(channel);
    for item in items {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
        if !product.is_available_at(&outlet.id) {
            return Err(CoreError::ProductUnavailable {
                product_id: product.id.clone(),
                outlet_id: outlet.id.clone(),
            }
            .into());
        }
        cart.add_item(product, &item.variant_id, item.quantity, state.prices())?;
    }
    Ok(cart)
}

async fn resolve_member(
    state: &AppState,
    member_id: Option<&str>,
) -> ApiResult<Option<MemberIdentity>> {
    let Some(member_id) = member_id.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(None);
    };

    let customer = state
        .db
        .customers()
        .get_by_member_id(member_id)
        .await?
        .ok_or_else(|| CoreError::MemberNotFound(member_id.to_string()))?;

    Ok(customer.member_identity())
}

/// Collisions and contention that another attempt may get past.
fn is_retryable(err: &DbError) -> bool {
    matches!(err, DbError::StockConflict { .. })
        || err.is_busy()
        || err.is_unique_violation_on("number")
}

/// Shows what the register would charge for a cart.
pub async fn preview_checkout(
    state: &AppState,
    actor: &Actor,
    input: CheckoutInput,
) -> ApiResult<CheckoutPreview> {
    let now = state.now();
    let prepared = prepare(state, actor, &input, now).await?;

    let subtotal = prepared.cart.subtotal();
    let (discount_amount, total) = apply_discount(subtotal, prepared.discount.as_ref());

    Ok(CheckoutPreview {
        subtotal,
        discount_amount,
        total,
        cart: prepared.cart,
        discount: prepared.discount,
    })
}

/// Sells the cart: prices it, applies the best discount, decrements
/// tracked stock and records the transaction.
pub async fn checkout(
    state: &AppState,
    actor: &Actor,
    input: CheckoutInput,
) -> ApiResult<Transaction> {
    debug!(cashier_id = %actor.user_id, items = input.items.len(), "checkout command");

    let now = state.now();
    let prepared = prepare(state, actor, &input, now).await?;
    let outlet = &prepared.outlet;

    let session = state
        .db
        .sessions()
        .find_active(&actor.user_id)
        .await?
        .filter(|s| s.outlet_id == outlet.id);
    if session.is_none() && state.config.checkout.require_open_session {
        return Err(CoreError::NoActiveSession {
            cashier_id: actor.user_id.clone(),
        }
        .into());
    }

    let request = CheckoutRequest {
        cart: prepared.cart,
        discount: prepared.discount,
        payment_method: input.payment_method,
        amount_tendered: input.amount_tendered,
        cashier_id: actor.user_id.clone(),
        member: prepared.member,
        customer_id: None,
        customer_name: input
            .customer_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
    };

    let plan = decrement_plan(&request.cart);
    let tracked: Vec<String> = plan.iter().map(|d| d.variant_id.clone()).collect();
    let date = business_date(now, state.config.store.utc_offset_minutes);
    let max_attempts = state.config.checkout.max_attempts;

    for attempt in 1..=max_attempts {
        let snapshot = state.db.products().stock_snapshot(&tracked).await?;
        check_availability(&request.cart, &snapshot)?;

        let sequence = state
            .db
            .transactions()
            .next_sequence(&outlet.code(), date)
            .await?;

        let ctx = CheckoutContext {
            outlet,
            sequence,
            now,
            utc_offset_minutes: state.config.store.utc_offset_minutes,
            cashier_session_id: session.as_ref().map(|s| s.id.clone()),
        };
        let transaction = assemble(&request, &ctx)?;

        match state.db.transactions().commit_checkout(&transaction, &plan).await {
            Ok(()) => {
                info!(
                    number = %transaction.number,
                    total = %transaction.total,
                    discount = %transaction.discount_amount,
                    attempt,
                    "Checkout committed"
                );
                return Ok(transaction);
            }
            Err(err) if is_retryable(&err) => {
                warn!(attempt, max_attempts, error = %err, "Checkout contended, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(cashier_id = %actor.user_id, max_attempts, "Checkout gave up after contention");
    Err(ApiError::retry())
}
