//! # Transaction Assembly
//!
//! Turns a priced cart, the chosen discount and the payment into a
//! [`Transaction`] ready to be persisted.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  backoffice                      kedai-core              kedai-db       │
//! │  ──────────                      ──────────              ────────       │
//! │  next_sequence(outlet, date) ─────────────────────────► COUNT(*) + 1   │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  assemble(request, context) ──► subtotal                               │
//! │                                 discount (≤ subtotal)                  │
//! │                                 total, tender, change                  │
//! │                                 YYMMDD-CODE-NNN                        │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  commit_checkout(tx, decrements) ─────────────────────► one SQL tx     │
//! │          │                                                              │
//! │          └── duplicate number / busy ──► retry from the top (bounded)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    AppliedDiscount, DiscountAudience, MemberIdentity, Outlet, PaymentMethod, Transaction,
};
use crate::validation::validate_quantity;

// =============================================================================
// Transaction Number
// =============================================================================

/// Human-readable transaction number: `YYMMDD-CODE-NNN`.
///
/// The sequence restarts at 1 every business day for every outlet and is
/// zero-padded to three digits (wider once it passes 999).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionNumber {
    pub date: NaiveDate,
    pub outlet_code: String,
    pub sequence: u32,
}

impl TransactionNumber {
    pub fn new(date: NaiveDate, outlet_code: &str, sequence: u32) -> Self {
        TransactionNumber {
            date,
            outlet_code: outlet_code.to_string(),
            sequence,
        }
    }
}

impl fmt::Display for TransactionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:03}",
            self.date.format("%y%m%d"),
            self.outlet_code,
            self.sequence
        )
    }
}

impl FromStr for TransactionNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "number".to_string(),
            reason: "expected YYMMDD-CODE-NNN".to_string(),
        };

        let mut parts = s.splitn(3, '-');
        let (Some(date), Some(code), Some(seq)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        let date = NaiveDate::parse_from_str(date, "%y%m%d").map_err(|_| invalid())?;
        let sequence = seq.parse::<u32>().map_err(|_| invalid())?;
        if code.is_empty() {
            return Err(invalid());
        }

        Ok(TransactionNumber {
            date,
            outlet_code: code.to_string(),
            sequence,
        })
    }
}

/// Calendar date of `now` in the store's UTC offset.
///
/// An offset outside ±24h falls back to the UTC date.
pub fn business_date(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    FixedOffset::east_opt(utc_offset_minutes * 60)
        .map(|offset| now.with_timezone(&offset).date_naive())
        .unwrap_or_else(|| now.date_naive())
}

// =============================================================================
// Request & Context
// =============================================================================

/// What the cashier submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Priced for its channel.
    pub cart: Cart,
    pub discount: Option<AppliedDiscount>,
    pub payment_method: PaymentMethod,
    /// Required for cash.
    pub amount_tendered: Option<Money>,
    pub cashier_id: String,
    pub member: Option<MemberIdentity>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
}

/// Where and when the transaction happens.
#[derive(Debug, Clone)]
pub struct CheckoutContext<'a> {
    pub outlet: &'a Outlet,
    /// From `TransactionRepository::next_sequence`.
    pub sequence: u32,
    pub now: DateTime<Utc>,
    pub utc_offset_minutes: i32,
    pub cashier_session_id: Option<String>,
}

// =============================================================================
// Assembly
// =============================================================================

/// Discount actually taken off `subtotal`, and the resulting total.
///
/// The amount is clamped to `0..=subtotal`, so the total is never negative.
pub fn apply_discount(subtotal: Money, discount: Option<&AppliedDiscount>) -> (Money, Money) {
    let discount_amount = discount
        .map(|d| d.amount.non_negative().min(subtotal))
        .unwrap_or_default();
    (discount_amount, (subtotal - discount_amount).non_negative())
}

/// Builds the transaction for a checkout.
///
/// ## Errors
/// - `Validation` for an empty cart, a bad quantity, or cash without tender
/// - `MemberValidationRequired` for a members-only discount without a member
/// - `InsufficientTender` when cash does not cover the total
pub fn assemble(request: &CheckoutRequest, ctx: &CheckoutContext<'_>) -> CoreResult<Transaction> {
    let cart = &request.cart;
    if cart.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        }
        .into());
    }
    for line in &cart.lines {
        validate_quantity(line.quantity)?;
    }

    if let Some(discount) = &request.discount {
        if discount.audience == DiscountAudience::MembersOnly && request.member.is_none() {
            return Err(CoreError::MemberValidationRequired {
                rule_name: discount.rule_name.clone(),
            });
        }
    }

    let subtotal = cart.subtotal();
    let (discount_amount, total) = apply_discount(subtotal, request.discount.as_ref());

    let (amount_tendered, change) = if request.payment_method.is_cash() {
        let tendered = request
            .amount_tendered
            .ok_or_else(|| ValidationError::Required {
                field: "amount_tendered".to_string(),
            })?;
        if tendered < total {
            return Err(CoreError::InsufficientTender { total, tendered });
        }
        (Some(tendered), Some(tendered - total))
    } else {
        (None, None)
    };

    let date = business_date(ctx.now, ctx.utc_offset_minutes);
    let number = TransactionNumber::new(date, &ctx.outlet.code(), ctx.sequence);

    let (customer_id, customer_name) = match &request.member {
        Some(member) => (Some(member.customer_id.clone()), Some(member.name.clone())),
        None => (request.customer_id.clone(), request.customer_name.clone()),
    };

    Ok(Transaction {
        id: uuid::Uuid::new_v4().to_string(),
        number: number.to_string(),
        business_date: date,
        daily_sequence: ctx.sequence,
        lines: cart.lines.clone(),
        subtotal,
        discount: request.discount.clone().map(|mut applied| {
            applied.amount = discount_amount;
            applied
        }),
        discount_amount,
        total,
        created_at: ctx.now,
        outlet_id: ctx.outlet.id.clone(),
        outlet_name: ctx.outlet.name.clone(),
        channel: cart.channel.clone(),
        payment_method: request.payment_method,
        amount_tendered,
        change,
        cashier_id: request.cashier_id.clone(),
        customer_id,
        customer_name,
        member_id: request.member.as_ref().map(|m| m.member_id.clone()),
        cashier_session_id: ctx.cashier_session_id.clone(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use crate::types::OrderChannel;
    use chrono::TimeZone;

    fn outlet() -> Outlet {
        Outlet {
            id: "outlet-1".to_string(),
            name: "Kedai Kopi Senja".to_string(),
        }
    }

    fn cart(price: i64, qty: i64) -> Cart {
        Cart {
            channel: OrderChannel::InStore,
            lines: vec![CartLine {
                product_id: "kopi".to_string(),
                product_name: "Es Kopi Susu".to_string(),
                category_id: "coffee".to_string(),
                variant_id: "kopi-r".to_string(),
                variant_name: "Regular".to_string(),
                base_price: Money::from_units(price),
                unit_price: Money::from_units(price),
                quantity: qty,
                track_stock: false,
            }],
        }
    }

    fn request(cart: Cart) -> CheckoutRequest {
        CheckoutRequest {
            cart,
            discount: None,
            payment_method: PaymentMethod::Qris,
            amount_tendered: None,
            cashier_id: "cashier-1".to_string(),
            member: None,
            customer_id: None,
            customer_name: None,
        }
    }

    fn discount(amount: i64, audience: DiscountAudience) -> AppliedDiscount {
        AppliedDiscount {
            rule_id: "r1".to_string(),
            rule_name: "Promo".to_string(),
            amount: Money::from_units(amount),
            audience,
        }
    }

    fn assemble_at(req: &CheckoutRequest, now: DateTime<Utc>, sequence: u32) -> CoreResult<Transaction> {
        let outlet = outlet();
        let ctx = CheckoutContext {
            outlet: &outlet,
            sequence,
            now,
            utc_offset_minutes: 420,
            cashier_session_id: Some("session-1".to_string()),
        };
        assemble(req, &ctx)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 5, 0, 0).unwrap()
    }

    #[test]
    fn test_totals_with_discount() {
        let mut req = request(cart(50_000, 2));
        req.discount = Some(discount(5_000, DiscountAudience::Everyone));

        let tx = assemble_at(&req, noon(), 1).unwrap();
        assert_eq!(tx.subtotal.units(), 100_000);
        assert_eq!(tx.discount_amount.units(), 5_000);
        assert_eq!(tx.total.units(), 95_000);
        assert_eq!(tx.amount_tendered, None);
        assert_eq!(tx.change, None);
        assert_eq!(tx.cashier_session_id.as_deref(), Some("session-1"));
    }

    #[test]
    fn test_discount_clipped_to_subtotal() {
        let mut req = request(cart(8_000, 1));
        req.discount = Some(discount(10_000, DiscountAudience::Everyone));

        let tx = assemble_at(&req, noon(), 1).unwrap();
        assert_eq!(tx.discount_amount.units(), 8_000);
        assert_eq!(tx.discount.map(|d| d.amount.units()), Some(8_000));
        assert_eq!(tx.total, Money::zero());
    }

    #[test]
    fn test_apply_discount_clamps() {
        let subtotal = Money::from_units(20_000);
        assert_eq!(apply_discount(subtotal, None), (Money::zero(), subtotal));

        let big = discount(25_000, DiscountAudience::Everyone);
        assert_eq!(apply_discount(subtotal, Some(&big)), (subtotal, Money::zero()));

        let negative = discount(-3_000, DiscountAudience::Everyone);
        assert_eq!(apply_discount(subtotal, Some(&negative)), (Money::zero(), subtotal));
    }

    #[test]
    fn test_cash_change() {
        let mut req = request(cart(18_000, 1));
        req.payment_method = PaymentMethod::Cash;
        req.amount_tendered = Some(Money::from_units(20_000));

        let tx = assemble_at(&req, noon(), 1).unwrap();
        assert_eq!(tx.change, Some(Money::from_units(2_000)));
        assert_eq!(tx.amount_tendered, Some(Money::from_units(20_000)));
    }

    #[test]
    fn test_cash_insufficient_or_missing_tender() {
        let mut req = request(cart(18_000, 1));
        req.payment_method = PaymentMethod::Cash;
        req.amount_tendered = Some(Money::from_units(15_000));
        assert!(matches!(
            assemble_at(&req, noon(), 1),
            Err(CoreError::InsufficientTender { .. })
        ));

        req.amount_tendered = None;
        assert!(matches!(
            assemble_at(&req, noon(), 1),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_empty_cart_rejected() {
        let req = request(Cart::new(OrderChannel::InStore));
        assert!(matches!(
            assemble_at(&req, noon(), 1),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let req = request(cart(18_000, 0));
        assert!(matches!(
            assemble_at(&req, noon(), 1),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_members_only_discount_needs_member() {
        let mut req = request(cart(50_000, 1));
        req.discount = Some(discount(5_000, DiscountAudience::MembersOnly));
        assert!(matches!(
            assemble_at(&req, noon(), 1),
            Err(CoreError::MemberValidationRequired { .. })
        ));

        req.member = Some(MemberIdentity {
            member_id: "MBR-001".to_string(),
            customer_id: "cust-1".to_string(),
            name: "Sari".to_string(),
        });
        let tx = assemble_at(&req, noon(), 1).unwrap();
        assert_eq!(tx.member_id.as_deref(), Some("MBR-001"));
        assert_eq!(tx.customer_id.as_deref(), Some("cust-1"));
        assert_eq!(tx.customer_name.as_deref(), Some("Sari"));
    }

    #[test]
    fn test_transaction_number_format() {
        let tx = assemble_at(&request(cart(18_000, 1)), noon(), 7).unwrap();
        assert_eq!(tx.number, "240309-KKS-007");
        assert_eq!(tx.daily_sequence, 7);

        let wide = TransactionNumber::new(tx.business_date, "KKS", 1_234);
        assert_eq!(wide.to_string(), "240309-KKS-1234");
    }

    #[test]
    fn test_business_date_uses_store_offset() {
        // 18:30 UTC on the 9th is already the 10th in UTC+7
        let late = Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0).unwrap();
        assert_eq!(business_date(late, 420), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(business_date(late, 0), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());

        let tx = assemble_at(&request(cart(18_000, 1)), late, 1).unwrap();
        assert!(tx.number.starts_with("240310-"));
    }

    #[test]
    fn test_parse_number() {
        let parsed: TransactionNumber = "240309-KKS-012".parse().unwrap();
        assert_eq!(parsed.sequence, 12);
        assert_eq!(parsed.outlet_code, "KKS");
        assert_eq!(parsed.to_string(), "240309-KKS-012");

        assert!("garbage".parse::<TransactionNumber>().is_err());
    }

    #[test]
    fn test_numbers_increase_with_sequence() {
        let req = request(cart(18_000, 1));
        let numbers: Vec<String> = (1..=12)
            .map(|seq| assemble_at(&req, noon(), seq).unwrap().number)
            .collect();

        for pair in numbers.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }
}
