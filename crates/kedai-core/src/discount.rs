//! # Discount Evaluation
//!
//! Picks the single best discount for a cart.
//!
//! ## Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each rule (in the order given):                                    │
//! │                                                                         │
//! │    1. eligible?  active, audience, min purchase, validity window,      │
//! │                  every bundle product in the cart                       │
//! │    2. amount     scope total (order / product lines / category lines)  │
//! │                  × rate (half up), capped   or   min(fixed, total)     │
//! │    3. best-of    strictly greater wins, ties keep the earlier rule     │
//! │                                                                         │
//! │  No rule with a positive amount → no discount.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Discounts never stack: a transaction carries at most one.

use chrono::{DateTime, Utc};

use crate::cart::Cart;
use crate::money::Money;
use crate::types::{AppliedDiscount, DiscountRule, DiscountScope, DiscountValue};

/// Everything a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct DiscountContext<'a> {
    pub cart: &'a Cart,
    pub is_member: bool,
    /// Total used for minimum purchase and entire-order scope.
    pub cart_total: Money,
    pub now: DateTime<Utc>,
}

impl<'a> DiscountContext<'a> {
    /// Context using the cart's own subtotal.
    pub fn for_cart(cart: &'a Cart, is_member: bool, now: DateTime<Utc>) -> Self {
        DiscountContext {
            cart,
            is_member,
            cart_total: cart.subtotal(),
            now,
        }
    }
}

/// Whether `rule` may apply to this cart at all.
pub fn is_eligible(rule: &DiscountRule, ctx: &DiscountContext<'_>) -> bool {
    if !rule.is_active || !rule.audience.matches(ctx.is_member) {
        return false;
    }

    if ctx.cart_total < rule.min_purchase.unwrap_or_default() {
        return false;
    }

    if ctx.now < rule.valid_from {
        return false;
    }
    if rule.valid_until.is_some_and(|until| ctx.now > until) {
        return false;
    }

    rule.bundle_product_ids
        .iter()
        .all(|id| ctx.cart.contains_product(id))
}

/// Candidate amount for one rule, or `None` if the rule is not eligible.
///
/// An eligible rule whose scope matches nothing yields `Some(0)`.
pub fn evaluate_rule(rule: &DiscountRule, ctx: &DiscountContext<'_>) -> Option<Money> {
    if !is_eligible(rule, ctx) {
        return None;
    }

    let base = match &rule.scope {
        DiscountScope::EntireOrder => ctx.cart_total,
        DiscountScope::Product { product_id } => ctx.cart.product_total(product_id),
        DiscountScope::Category { category_id } => ctx.cart.category_total(category_id),
    }
    .non_negative();

    let amount = match rule.value {
        DiscountValue::Percentage { rate, cap } => {
            let raw = base.percent(rate);
            match cap {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountValue::FixedAmount { amount } => amount.min(base),
    };

    Some(amount.non_negative())
}

/// Selects the best applicable discount.
///
/// Deterministic: the same inputs always give the same result. When two
/// rules produce the same amount, the one listed first wins.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use kedai_core::{select_best_discount, Cart, Money, OrderChannel};
///
/// let cart = Cart::new(OrderChannel::InStore);
/// assert!(select_best_discount(&cart, false, &[], Money::zero(), Utc::now()).is_none());
/// ```
pub fn select_best_discount(
    cart: &Cart,
    is_member: bool,
    rules: &[DiscountRule],
    cart_total: Money,
    now: DateTime<Utc>,
) -> Option<AppliedDiscount> {
    let ctx = DiscountContext {
        cart,
        is_member,
        cart_total,
        now,
    };

    let mut best: Option<(&DiscountRule, Money)> = None;
    for rule in rules {
        let Some(amount) = evaluate_rule(rule, &ctx) else {
            continue;
        };
        if !amount.is_positive() {
            continue;
        }
        if best.map_or(true, |(_, current)| amount > current) {
            best = Some((rule, amount));
        }
    }

    best.map(|(rule, amount)| AppliedDiscount {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        amount,
        audience: rule.audience,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
