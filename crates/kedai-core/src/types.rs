//! # Domain Types
//!
//! Core domain types used throughout Kedai POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  DiscountRule   │   │  Transaction    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  category_id    │   │  audience       │   │  number         │       │
//! │  │  outlet_id?     │   │  value / cap    │   │  lines          │       │
//! │  │  variants[1..]  │   │  scope          │   │  discount?      │       │
//! │  └────────┬────────┘   │  bundle ids     │   │  payment_method │       │
//! │           │            └─────────────────┘   │  session id?    │       │
//! │  ┌────────▼────────┐                         └─────────────────┘       │
//! │  │ ProductVariant  │   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  base_price     │   │ CashierSession  │   │    Customer     │       │
//! │  │  track_stock    │   │  initial_cash   │   │  phone (unique) │       │
//! │  │  stock          │   │  status         │   │  total_spent    │       │
//! │  └─────────────────┘   │  variance       │   │  member_id?     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is identified by a UUID v4 string. The only human-readable
//! business key is the transaction number (`YYMMDD-CODE-NNN`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::cart::CartLine;
use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so a 12.5% platform markup is stored
/// exactly as 1250 and applied with integer math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// 100%.
    pub const FULL: Percentage = Percentage(10_000);

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a whole number of percent (`10` = 10%).
    #[inline]
    pub const fn from_whole(percent: u32) -> Self {
        Percentage(percent * 100)
    }

    /// Creates a percentage from a decimal percent value (config files).
    ///
    /// Negative and non-finite inputs become zero.
    pub fn from_percent(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return Percentage(0);
        }
        Percentage((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{:.2}%", self.percentage())
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category (drinks, snacks, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A physical store location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Outlet {
    pub id: String,
    pub name: String,
}

impl Outlet {
    /// Short code used in transaction numbers (see [`outlet_code`]).
    pub fn code(&self) -> String {
        outlet_code(&self.name)
    }
}

/// Derives the outlet code from an outlet name.
///
/// First letter of each word, upper-cased, at most 4 characters.
/// Names with no usable letters fall back to `POS`.
///
/// ## Example
/// ```rust
/// use kedai_core::types::outlet_code;
///
/// assert_eq!(outlet_code("Kedai Kopi Senja"), "KKS");
/// assert_eq!(outlet_code("toko roti manis jaya abadi"), "TRMJ");
/// ```
pub fn outlet_code(name: &str) -> String {
    let code: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .flat_map(char::to_uppercase)
        .take(4)
        .collect();

    if code.is_empty() {
        "POS".to_string()
    } else {
        code
    }
}

/// A sellable variant of a product (size, flavour, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductVariant {
    pub id: String,

    /// Display name ("Regular", "Large", ...).
    pub name: String,

    /// In-store price in whole currency units.
    pub base_price: Money,

    /// Cost of goods, for margin reporting.
    pub cost_price: Money,

    /// Whether stock is counted for this variant.
    pub track_stock: bool,

    /// Current stock. Only meaningful when `track_stock` is set.
    pub stock: i64,
}

/// A product with one or more variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: String,

    /// Never empty (see [`Product::validate`]).
    pub variants: Vec<ProductVariant>,

    /// `None` = sold at every outlet.
    pub outlet_id: Option<String>,

    pub is_active: bool,
}

impl Product {
    /// Checks the structural invariants of a product.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            });
        }
        if self.variants.is_empty() {
            return Err(ValidationError::Required {
                field: "variants".to_string(),
            });
        }
        for variant in &self.variants {
            if variant.base_price.is_negative() {
                return Err(ValidationError::OutOfRange {
                    field: "base_price".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }
        Ok(())
    }

    /// Looks up one of this product's variants.
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Whether the product may be sold at `outlet_id`.
    pub fn is_available_at(&self, outlet_id: &str) -> bool {
        self.is_active
            && self
                .outlet_id
                .as_deref()
                .map_or(true, |affinity| affinity == outlet_id)
    }
}

// =============================================================================
// Order Channel
// =============================================================================

/// Where an order comes from.
///
/// Serialized as `"in_store"` or the delivery platform slug (`"gofood"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "String", try_from = "String")]
pub enum OrderChannel {
    /// Walk-in customer at the counter.
    #[default]
    InStore,
    /// A named delivery platform.
    Delivery(String),
}

impl OrderChannel {
    pub const IN_STORE: &'static str = "in_store";

    /// Creates a delivery channel, normalizing the slug.
    pub fn delivery(platform: &str) -> Result<Self, ValidationError> {
        platform.parse()
    }

    #[inline]
    pub fn is_in_store(&self) -> bool {
        matches!(self, OrderChannel::InStore)
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderChannel::InStore => Self::IN_STORE,
            OrderChannel::Delivery(slug) => slug,
        }
    }
}

impl fmt::Display for OrderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderChannel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slug = s.trim().to_lowercase();
        match slug.as_str() {
            "" => Err(ValidationError::Required {
                field: "channel".to_string(),
            }),
            "in_store" | "store" | "instore" => Ok(OrderChannel::InStore),
            other if other
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
            {
                Ok(OrderChannel::Delivery(other.to_string()))
            }
            _ => Err(ValidationError::InvalidFormat {
                field: "channel".to_string(),
                reason: "must contain only letters, numbers, hyphens, and underscores"
                    .to_string(),
            }),
        }
    }
}

impl From<OrderChannel> for String {
    fn from(channel: OrderChannel) -> Self {
        channel.as_str().to_string()
    }
}

impl TryFrom<String> for OrderChannel {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Markup percentage per delivery platform.
///
/// Platforms without an entry are priced with a 0% markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMarkups(HashMap<String, Percentage>);

impl ChannelMarkups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, platform: &str, markup: Percentage) -> Self {
        self.set(platform, markup);
        self
    }

    pub fn set(&mut self, platform: &str, markup: Percentage) {
        self.0.insert(platform.trim().to_lowercase(), markup);
    }

    /// Markup for a channel; in-store is always zero.
    pub fn markup_for(&self, channel: &OrderChannel) -> Percentage {
        match channel {
            OrderChannel::InStore => Percentage::zero(),
            OrderChannel::Delivery(slug) => self.0.get(slug).copied().unwrap_or_default(),
        }
    }

    /// Configured platforms, sorted.
    pub fn platforms(&self) -> Vec<&str> {
        let mut platforms: Vec<&str> = self.0.keys().map(String::as_str).collect();
        platforms.sort_unstable();
        platforms
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash into the drawer.
    Cash,
    /// QRIS scan-to-pay.
    Qris,
    /// Settled through the delivery platform's balance.
    PlatformBalance,
}

impl PaymentMethod {
    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "tunai" => Ok(PaymentMethod::Cash),
            "qris" => Ok(PaymentMethod::Qris),
            "platform_balance" | "platform" => Ok(PaymentMethod::PlatformBalance),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec![
                    "cash".to_string(),
                    "qris".to_string(),
                    "platform_balance".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Discount Rules
// =============================================================================

/// Which customers a discount rule targets.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountAudience {
    #[default]
    Everyone,
    MembersOnly,
    NonMembersOnly,
}

impl DiscountAudience {
    /// Whether a customer with the given membership status is targeted.
    pub fn matches(&self, is_member: bool) -> bool {
        match self {
            DiscountAudience::Everyone => true,
            DiscountAudience::MembersOnly => is_member,
            DiscountAudience::NonMembersOnly => !is_member,
        }
    }
}

/// Storage tag for [`DiscountValue`].
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
}

/// How much a discount rule takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountValue {
    /// A percentage of the scoped amount, optionally capped.
    Percentage { rate: Percentage, cap: Option<Money> },
    /// A flat amount, never more than the scoped amount.
    FixedAmount { amount: Money },
}

impl DiscountValue {
    pub fn kind(&self) -> DiscountKind {
        match self {
            DiscountValue::Percentage { .. } => DiscountKind::Percentage,
            DiscountValue::FixedAmount { .. } => DiscountKind::FixedAmount,
        }
    }

    /// Rebuilds a value from its flat storage columns.
    ///
    /// `raw` is basis points for percentages and currency units for fixed
    /// amounts. The cap only applies to percentages.
    pub fn from_parts(
        kind: DiscountKind,
        raw: i64,
        cap: Option<Money>,
    ) -> Result<Self, ValidationError> {
        match kind {
            DiscountKind::Percentage => {
                let bps = u32::try_from(raw).map_err(|_| ValidationError::OutOfRange {
                    field: "value".to_string(),
                    min: 0,
                    max: u32::MAX as i64,
                })?;
                Ok(DiscountValue::Percentage {
                    rate: Percentage::from_bps(bps),
                    cap,
                })
            }
            DiscountKind::FixedAmount => Ok(DiscountValue::FixedAmount {
                amount: Money::from_units(raw),
            }),
        }
    }

    /// Flat storage columns: `(kind, raw value, cap)`.
    pub fn to_parts(&self) -> (DiscountKind, i64, Option<Money>) {
        match *self {
            DiscountValue::Percentage { rate, cap } => {
                (DiscountKind::Percentage, rate.bps() as i64, cap)
            }
            DiscountValue::FixedAmount { amount } => (DiscountKind::FixedAmount, amount.units(), None),
        }
    }
}

/// Storage tag for [`DiscountScope`].
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScopeKind {
    EntireOrder,
    Product,
    Category,
}

/// What part of the cart a discount rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum DiscountScope {
    EntireOrder,
    Product { product_id: String },
    Category { category_id: String },
}

impl DiscountScope {
    pub fn kind(&self) -> DiscountScopeKind {
        match self {
            DiscountScope::EntireOrder => DiscountScopeKind::EntireOrder,
            DiscountScope::Product { .. } => DiscountScopeKind::Product,
            DiscountScope::Category { .. } => DiscountScopeKind::Category,
        }
    }

    /// Target id for product/category scopes.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            DiscountScope::EntireOrder => None,
            DiscountScope::Product { product_id } => Some(product_id),
            DiscountScope::Category { category_id } => Some(category_id),
        }
    }

    /// Rebuilds a scope from its flat storage columns.
    ///
    /// Product and category scopes require a non-empty target.
    pub fn from_parts(
        kind: DiscountScopeKind,
        target_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let target = target_id.filter(|t| !t.trim().is_empty());
        match (kind, target) {
            (DiscountScopeKind::EntireOrder, _) => Ok(DiscountScope::EntireOrder),
            (DiscountScopeKind::Product, Some(product_id)) => {
                Ok(DiscountScope::Product { product_id })
            }
            (DiscountScopeKind::Category, Some(category_id)) => {
                Ok(DiscountScope::Category { category_id })
            }
            (_, None) => Err(ValidationError::Required {
                field: "target_id".to_string(),
            }),
        }
    }
}

/// A discount rule configured by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRule {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub valid_from: DateTime<Utc>,
    /// `None` = never expires.
    #[ts(as = "Option<String>")]
    pub valid_until: Option<DateTime<Utc>>,
    pub audience: DiscountAudience,
    pub value: DiscountValue,
    /// Minimum cart total for the rule to qualify.
    pub min_purchase: Option<Money>,
    pub scope: DiscountScope,
    /// Every listed product must be in the cart for the rule to qualify.
    pub bundle_product_ids: Vec<String>,
}

/// The discount chosen for a cart. At most one per transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedDiscount {
    pub rule_id: String,
    pub rule_name: String,
    pub amount: Money,
    /// Carried so checkout can demand a validated member.
    pub audience: DiscountAudience,
}

// =============================================================================
// Transaction
// =============================================================================

/// A finalized sale.
///
/// Immutable once recorded, except for the customer backfill
/// (`customer_id` / `customer_name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// `YYMMDD-CODE-NNN`.
    pub number: String,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub daily_sequence: u32,
    /// Cart lines frozen at the time of sale.
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
    pub discount: Option<AppliedDiscount>,
    /// Discount actually taken off (never more than the subtotal).
    pub discount_amount: Money,
    pub total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub outlet_id: String,
    pub outlet_name: String,
    #[ts(as = "String")]
    pub channel: OrderChannel,
    pub payment_method: PaymentMethod,
    /// Cash only.
    pub amount_tendered: Option<Money>,
    /// Cash only.
    pub change: Option<Money>,
    pub cashier_id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub member_id: Option<String>,
    pub cashier_session_id: Option<String>,
}

impl Transaction {
    /// Total number of items sold.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Expense
// =============================================================================

/// Cash taken out of the drawer (supplies, ice, parking, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub outlet_id: String,
    pub description: String,
    pub amount: Money,
    pub cashier_id: String,
    pub cashier_session_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cashier Session
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Drawer is open and taking sales.
    #[default]
    Active,
    /// Drawer was counted and closed. Terminal.
    Closed,
}

/// One cashier's shift at a cash drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashierSession {
    pub id: String,
    pub cashier_id: String,
    pub cashier_name: String,
    pub outlet_id: String,
    pub outlet_name: String,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    /// Opening float.
    pub initial_cash: Money,
    pub status: SessionStatus,
    #[ts(as = "Option<String>")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Cash counted by hand at close.
    pub counted_cash: Option<Money>,
    /// What the drawer should hold at close.
    pub expected_cash: Option<Money>,
    /// `counted_cash - expected_cash`.
    pub variance: Option<Money>,
}

impl CashierSession {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

// =============================================================================
// Customers & Members
// =============================================================================

/// A customer known by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Normalized (`628...`), unique.
    pub phone: String,
    pub total_spent: Money,
    #[ts(as = "Option<String>")]
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub transaction_ids: Vec<String>,
    pub member_id: Option<String>,
}

/// A member whose code has been scanned and validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MemberIdentity {
    pub member_id: String,
    pub customer_id: String,
    pub name: String,
}

impl Customer {
    /// The member identity for this customer, if they hold a membership.
    pub fn member_identity(&self) -> Option<MemberIdentity> {
        self.member_id.as_ref().map(|member_id| MemberIdentity {
            member_id: member_id.clone(),
            customer_id: self.id.clone(),
            name: self.name.clone(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
