//! # kedai-core: Pure Business Logic for Kedai POS
//!
//! This crate is the **heart** of Kedai POS. It contains the pricing,
//! discount and cash-drawer logic as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kedai POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apps/backoffice (commands)                     │   │
//! │  │   checkout, open/close session, link_customer, drafts, ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kedai-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   pricing ──► discount ──► stock ──► checkout      session     │   │
//! │  │   (channel)   (best-of)    (guard)   (assemble)   (drawer)     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kedai-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, DiscountRule, Transaction, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Channel price resolution
//! - [`discount`] - Best-discount selection
//! - [`stock`] - Stock availability guard
//! - [`checkout`] - Transaction assembly and numbering
//! - [`session`] - Cashier session lifecycle and reconciliation
//! - [`access`] - Role capabilities
//! - [`cart`] - Cart and draft-cart model
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: the clock is an argument (`now`), never read here
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: whole currency units in an i64
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use kedai_core::money::Money;
//! use kedai_core::pricing::resolve_price;
//! use kedai_core::types::{OrderChannel, Percentage, ProductVariant};
//!
//! let variant = ProductVariant {
//!     id: "v1".into(),
//!     name: "Regular".into(),
//!     base_price: Money::from_units(18_000),
//!     cost_price: Money::from_units(7_000),
//!     track_stock: false,
//!     stock: 0,
//! };
//!
//! let gofood = OrderChannel::delivery("gofood").unwrap();
//! // 18,000 + 20% = 21,600 → nearest 500
//! let price = resolve_price(&variant, &gofood, Percentage::from_whole(20));
//! assert_eq!(price.units(), 21_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod cart;
pub mod checkout;
pub mod discount;
pub mod error;
pub mod money;
pub mod pricing;
pub mod session;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use kedai_core::Money` instead of
// `use kedai_core::money::Money`

pub use access::{Actor, Capabilities, Role};
pub use cart::{Cart, CartLine, DraftCart};
pub use checkout::{
    apply_discount, assemble, business_date, CheckoutContext, CheckoutRequest, TransactionNumber,
};
pub use discount::{evaluate_rule, select_best_discount, DiscountContext};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{resolve_price, resolve_price_with_step, PriceBook};
pub use session::{close_session, open_session, CashierRef, SessionSummary};
pub use stock::{check_availability, decrement_plan, StockDecrement, StockSnapshot};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Delivery prices are rounded to the nearest multiple of this step.
pub const PRICE_STEP: i64 = 500;

/// Default store offset from UTC, in minutes (WIB, UTC+7).
///
/// Transaction numbers and daily sequences use the business date in this
/// offset, not the UTC date.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 420;

/// How many times checkout retries on a number collision or a busy database.
pub const MAX_CHECKOUT_ATTEMPTS: u32 = 5;

/// Draft carts older than this are treated as absent.
pub const DRAFT_TTL_HOURS: i64 = 24;

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps receipts printable.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
