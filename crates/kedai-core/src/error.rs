//! # Error Types
//!
//! Domain-specific error types for kedai-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kedai-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule rejections                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kedai-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Backoffice errors (in app)                                            │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts)
//! 3. Errors are enum variants, never String
//! 4. Business rejections are never retried

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. The backoffice layer turns
/// them into user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Variant {variant_id} not found for product {product_id}")]
    VariantNotFound {
        product_id: String,
        variant_id: String,
    },

    /// Product is inactive or bound to another outlet.
    #[error("Product {product_id} is not available at outlet {outlet_id}")]
    ProductUnavailable {
        product_id: String,
        outlet_id: String,
    },

    /// Not enough tracked stock to complete the sale.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: Es Kopi Susu × 5
    ///      │
    ///      ▼
    /// Snapshot: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Es Kopi Susu", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Es Kopi Susu left"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        /// Display name, e.g. "Es Kopi Susu (Large)".
        product: String,
        variant_id: String,
        available: i64,
        requested: i64,
    },

    /// Cash tendered does not cover the total.
    #[error("Amount tendered {tendered} is less than total {total}")]
    InsufficientTender { total: Money, tendered: Money },

    /// A members-only discount was selected but no member code was scanned.
    #[error("Discount '{rule_name}' is for members only: scan member QR first")]
    MemberValidationRequired { rule_name: String },

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Cashier {cashier_id} already has an active session")]
    SessionAlreadyActive { cashier_id: String },

    #[error("Cashier {cashier_id} has no active session")]
    NoActiveSession { cashier_id: String },

    #[error("Cashier session not found: {0}")]
    SessionNotFound(String),

    /// Session is not in a state that allows the requested operation.
    #[error("Session {session_id} is {current_status}, cannot perform operation")]
    InvalidSessionStatus {
        session_id: String,
        current_status: String,
    },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Customer backfill is one-shot.
    #[error("Transaction {transaction_id} already has a customer")]
    CustomerAlreadyLinked { transaction_id: String },

    #[error("Discount rule not found: {0}")]
    DiscountRuleNotFound(String),

    #[error("Outlet not found: {0}")]
    OutletNotFound(String),

    #[error("Draft cart not found: {0}")]
    DraftNotFound(String),

    /// The actor's role does not allow this action.
    #[error("Not allowed to {action}")]
    Forbidden { action: String },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., phone number, channel slug).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Es Kopi Susu (Large)".to_string(),
            variant_id: "kopi-l".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Es Kopi Susu (Large): available 3, requested 5"
        );

        let err = CoreError::InsufficientTender {
            total: Money::from_units(95_000),
            tendered: Money::from_units(50_000),
        };
        assert_eq!(
            err.to_string(),
            "Amount tendered Rp 50.000 is less than total Rp 95.000"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustNotBeNegative {
            field: "initial_cash".to_string(),
        };
        assert_eq!(err.to_string(), "initial_cash must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "lines".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
