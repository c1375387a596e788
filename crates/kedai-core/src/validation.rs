//! # Validation Module
//!
//! Input validation utilities for Kedai POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (TypeScript)                                        │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Backoffice command (Rust)                                    │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE constraints (transaction number, phone, active session)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kedai_core::validation::{normalize_phone, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//! assert_eq!(normalize_phone("0812-3456-7890").unwrap(), "6281234567890");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{DiscountRule, DiscountValue, Percentage};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, customer, rule, outlet, ...).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `max` characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(name.to_string())
}

/// Normalizes an Indonesian phone number to its `62...` form.
///
/// ## Rules
/// - Every non-digit character is dropped (`+`, spaces, dashes)
/// - A leading `0` becomes `62`
/// - The result must have 9 to 15 digits
///
/// ## Example
/// ```rust
/// use kedai_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("+62 812 3456 789").unwrap(), "628123456789");
/// assert_eq!(normalize_phone("08123456789").unwrap(), "628123456789");
/// assert!(normalize_phone("12-34").is_err());
/// ```
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let normalized = match digits.strip_prefix('0') {
        Some(rest) => format!("62{}", rest),
        None => digits,
    };

    if !(9..=15).contains(&normalized.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must have 9 to 15 digits".to_string(),
        });
    }

    Ok(normalized)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price. Zero is allowed (free items).
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an amount that must be strictly positive (expenses, fixed discounts).
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a markup rate. Markups above 100% are rejected.
pub fn validate_markup(markup: Percentage) -> ValidationResult<()> {
    if markup > Percentage::FULL {
        return Err(ValidationError::OutOfRange {
            field: "markup".to_string(),
            min: 0,
            max: Percentage::FULL.bps() as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a discount rule before it is stored.
///
/// ## Rules
/// - Name required (at most 100 characters)
/// - Percentage in (0%, 100%], cap positive when set
/// - Fixed amount positive
/// - Minimum purchase not negative
/// - `valid_until` not before `valid_from`
pub fn validate_discount_rule(rule: &DiscountRule) -> ValidationResult<()> {
    validate_name("name", &rule.name, 100)?;

    match rule.value {
        DiscountValue::Percentage { rate, cap } => {
            if rate.is_zero() || rate > Percentage::FULL {
                return Err(ValidationError::OutOfRange {
                    field: "value".to_string(),
                    min: 1,
                    max: Percentage::FULL.bps() as i64,
                });
            }
            if let Some(cap) = cap {
                validate_positive_amount("max_discount_amount", cap)?;
            }
        }
        DiscountValue::FixedAmount { amount } => {
            validate_positive_amount("value", amount)?;
        }
    }

    if let Some(min) = rule.min_purchase {
        validate_price("min_purchase", min)?;
    }

    if let Some(until) = rule.valid_until {
        if until < rule.valid_from {
            return Err(ValidationError::InvalidFormat {
                field: "valid_until".to_string(),
                reason: "must not be before valid_from".to_string(),
            });
        }
    }

    if rule.bundle_product_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "bundle_product_ids".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use kedai_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountAudience, DiscountScope};
    use chrono::{Duration, TimeZone, Utc};

    fn rule(value: DiscountValue) -> DiscountRule {
        DiscountRule {
            id: "r1".to_string(),
            name: "Promo Gajian".to_string(),
            is_active: true,
            valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            valid_until: None,
            audience: DiscountAudience::Everyone,
            value,
            min_purchase: None,
            scope: DiscountScope::EntireOrder,
            bundle_product_ids: vec![],
        }
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Es Teh  ", 50).unwrap(), "Es Teh");
        assert!(validate_name("name", "   ", 50).is_err());
        assert!(validate_name("name", &"A".repeat(51), 50).is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("0812-3456-7890").unwrap(), "6281234567890");
        assert_eq!(normalize_phone("+62 812 3456 7890").unwrap(), "6281234567890");
        assert_eq!(normalize_phone("6281234567890").unwrap(), "6281234567890");
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("abc").is_err());
        assert!(normalize_phone("0812").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price("price", Money::zero()).is_ok());
        assert!(validate_price("price", Money::from_units(-1)).is_err());
        assert!(validate_positive_amount("amount", Money::zero()).is_err());
        assert!(validate_positive_amount("amount", Money::from_units(5_000)).is_ok());
    }

    #[test]
    fn test_validate_markup() {
        assert!(validate_markup(Percentage::from_whole(20)).is_ok());
        assert!(validate_markup(Percentage::FULL).is_ok());
        assert!(validate_markup(Percentage::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_discount_rule() {
        let ok = rule(DiscountValue::Percentage {
            rate: Percentage::from_whole(10),
            cap: Some(Money::from_units(5_000)),
        });
        assert!(validate_discount_rule(&ok).is_ok());

        let zero_rate = rule(DiscountValue::Percentage {
            rate: Percentage::zero(),
            cap: None,
        });
        assert!(validate_discount_rule(&zero_rate).is_err());

        let over_full = rule(DiscountValue::Percentage {
            rate: Percentage::from_bps(10_001),
            cap: None,
        });
        assert!(validate_discount_rule(&over_full).is_err());

        let zero_cap = rule(DiscountValue::Percentage {
            rate: Percentage::from_whole(10),
            cap: Some(Money::zero()),
        });
        assert!(validate_discount_rule(&zero_cap).is_err());

        let free = rule(DiscountValue::FixedAmount {
            amount: Money::zero(),
        });
        assert!(validate_discount_rule(&free).is_err());

        let mut backwards = ok.clone();
        backwards.valid_until = Some(backwards.valid_from - Duration::days(1));
        assert!(validate_discount_rule(&backwards).is_err());

        let mut unnamed = ok;
        unnamed.name = " ".to_string();
        assert!(validate_discount_rule(&unnamed).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
