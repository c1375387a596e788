//! # Cart
//!
//! The cart being rung up, and the draft-cart wrapper that lets a cashier
//! park it.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation               Cart State Change                              │
//! │  ─────────               ─────────────────                              │
//! │  add_item()        ────► lines.push(line) or line.quantity += n        │
//! │  update_quantity() ────► line.quantity = n (0 removes)                 │
//! │  remove_item()     ────► lines.retain(..)                              │
//! │  set_channel()     ────► every unit_price re-resolved                  │
//! │                                                                         │
//! │  Lines are unique by variant id. Each line keeps the base price so a   │
//! │  channel change can reprice without another catalog lookup.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::PriceBook;
use crate::types::{OrderChannel, Product};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One variant in the cart.
///
/// ## Design Notes
/// Names and prices are frozen copies taken when the line was added, so the
/// cart (and the transaction built from it) displays consistent data even
/// if the catalog changes before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    pub category_id: String,
    pub variant_id: String,
    pub variant_name: String,
    /// In-store price, kept for repricing.
    pub base_price: Money,
    /// Price for the cart's channel.
    pub unit_price: Money,
    pub quantity: i64,
    pub track_stock: bool,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A cart for one order channel.
///
/// ## Invariants
/// - Lines are unique by `variant_id` (adding the same variant merges)
/// - Quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
/// - `unit_price` always matches `channel`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    #[ts(as = "String")]
    pub channel: OrderChannel,
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(channel: OrderChannel) -> Self {
        Cart {
            channel,
            lines: Vec::new(),
        }
    }

    /// Adds a variant to the cart or increases its quantity if present.
    ///
    /// ## Errors
    /// - `VariantNotFound` if the product has no such variant
    /// - `QuantityTooLarge` if the merged quantity would exceed the maximum
    /// - `CartTooLarge` when a new line would not fit
    /// - `Validation` for a non-positive quantity
    pub fn add_item(
        &mut self,
        product: &Product,
        variant_id: &str,
        quantity: i64,
        prices: &PriceBook,
    ) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let variant = product
            .variant(variant_id)
            .ok_or_else(|| CoreError::VariantNotFound {
                product_id: product.id.clone(),
                variant_id: variant_id.to_string(),
            })?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.variant_id == variant_id) {
            let merged = line.quantity + quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = merged;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.lines.push(CartLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            category_id: product.category_id.clone(),
            variant_id: variant.id.clone(),
            variant_name: variant.name.clone(),
            base_price: variant.base_price,
            unit_price: prices.price_for(variant, &self.channel),
            quantity,
            track_stock: variant.track_stock,
        });
        Ok(())
    }

    /// Sets the quantity of a line. Zero removes the line.
    pub fn update_quantity(&mut self, variant_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(variant_id);
        }
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id == variant_id)
            .ok_or_else(|| CoreError::VariantNotFound {
                product_id: String::new(),
                variant_id: variant_id.to_string(),
            })?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, variant_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.variant_id != variant_id);

        if self.lines.len() == before {
            Err(CoreError::VariantNotFound {
                product_id: String::new(),
                variant_id: variant_id.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Switches the order channel and reprices every line.
    pub fn set_channel(&mut self, channel: OrderChannel, prices: &PriceBook) {
        for line in &mut self.lines {
            line.unit_price = prices.price_base(line.base_price, &channel);
        }
        self.channel = channel;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// `Σ unit_price × quantity`.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }

    /// Sum of line totals for every line of `product_id`.
    pub fn product_total(&self, product_id: &str) -> Money {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(CartLine::line_total)
            .sum()
    }

    /// Sum of line totals for every line in `category_id`.
    pub fn category_total(&self, category_id: &str) -> Money {
        self.lines
            .iter()
            .filter(|l| l.category_id == category_id)
            .map(CartLine::line_total)
            .sum()
    }
}

// =============================================================================
// Draft Cart
// =============================================================================

/// A parked cart, owned by one user at one outlet.
///
/// Drafts expire `ttl` after creation. An expired draft is treated as if it
/// did not exist and is removed by the next reap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftCart {
    pub id: String,
    pub owner_id: String,
    pub outlet_id: String,
    pub cart: Cart,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl DraftCart {
    pub fn new(owner_id: &str, outlet_id: &str, cart: Cart, now: DateTime<Utc>) -> Self {
        DraftCart {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            outlet_id: outlet_id.to_string(),
            cart,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the parked cart. The expiry clock is not reset.
    pub fn update(&mut self, cart: Cart, now: DateTime<Utc>) {
        self.cart = cart;
        self.updated_at = now;
    }

    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.created_at + ttl
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now >= self.expires_at(ttl)
    }
}

/// Cut-off for reaping: drafts created before this are expired.
pub fn draft_expiry_cutoff(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now - ttl
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelMarkups, Percentage, ProductVariant};
    use chrono::TimeZone;

    fn product() -> Product {
        Product {
            id: "kopi".to_string(),
            name: "Es Kopi Susu".to_string(),
            category_id: "coffee".to_string(),
            variants: vec![
                ProductVariant {
                    id: "kopi-r".to_string(),
                    name: "Regular".to_string(),
                    base_price: Money::from_units(18_000),
                    cost_price: Money::from_units(7_000),
                    track_stock: true,
                    stock: 10,
                },
                ProductVariant {
                    id: "kopi-l".to_string(),
                    name: "Large".to_string(),
                    base_price: Money::from_units(22_000),
                    cost_price: Money::from_units(9_000),
                    track_stock: false,
                    stock: 0,
                },
            ],
            outlet_id: None,
            is_active: true,
        }
    }

    fn prices() -> PriceBook {
        PriceBook::new(ChannelMarkups::new().with("gofood", Percentage::from_whole(20)))
    }

    #[test]
    fn test_add_item_merges_same_variant() {
        let mut cart = Cart::new(OrderChannel::InStore);
        cart.add_item(&product(), "kopi-r", 2, &prices()).unwrap();
        cart.add_item(&product(), "kopi-r", 3, &prices()).unwrap();
        cart.add_item(&product(), "kopi-l", 1, &prices()).unwrap();

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.total_quantity(), 6);
        assert_eq!(cart.subtotal().units(), 5 * 18_000 + 22_000);
        assert_eq!(cart.product_total("kopi").units(), 112_000);
        assert_eq!(cart.category_total("coffee").units(), 112_000);
        assert_eq!(cart.category_total("snacks"), Money::zero());
    }

    #[test]
    fn test_add_item_rejects_bad_input() {
        let mut cart = Cart::new(OrderChannel::InStore);
        assert!(matches!(
            cart.add_item(&product(), "missing", 1, &prices()),
            Err(CoreError::VariantNotFound { .. })
        ));
        assert!(matches!(
            cart.add_item(&product(), "kopi-r", 0, &prices()),
            Err(CoreError::Validation(_))
        ));

        cart.add_item(&product(), "kopi-r", 999, &prices()).unwrap();
        assert!(matches!(
            cart.add_item(&product(), "kopi-r", 1, &prices()),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
    }

    #[test]
    fn test_delivery_cart_uses_marked_up_price() {
        let mut cart = Cart::new(OrderChannel::Delivery("gofood".into()));
        cart.add_item(&product(), "kopi-r", 1, &prices()).unwrap();
        assert_eq!(cart.lines[0].unit_price.units(), 21_500);
    }

    #[test]
    fn test_set_channel_reprices_lines() {
        let mut cart = Cart::new(OrderChannel::InStore);
        cart.add_item(&product(), "kopi-r", 2, &prices()).unwrap();
        assert_eq!(cart.subtotal().units(), 36_000);

        cart.set_channel(OrderChannel::Delivery("gofood".into()), &prices());
        assert_eq!(cart.lines[0].unit_price.units(), 21_500);
        assert_eq!(cart.subtotal().units(), 43_000);

        cart.set_channel(OrderChannel::InStore, &prices());
        assert_eq!(cart.subtotal().units(), 36_000);
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = Cart::new(OrderChannel::InStore);
        cart.add_item(&product(), "kopi-r", 2, &prices()).unwrap();

        cart.update_quantity("kopi-r", 4).unwrap();
        assert_eq!(cart.total_quantity(), 4);

        cart.update_quantity("kopi-r", 0).unwrap();
        assert!(cart.is_empty());
        assert!(cart.remove_item("kopi-r").is_err());
    }

    #[test]
    fn test_draft_expiry() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        let mut draft = DraftCart::new("cashier-1", "outlet-1", Cart::default(), created);
        let ttl = Duration::hours(24);

        assert!(!draft.is_expired(created + Duration::hours(23), ttl));
        assert!(draft.is_expired(created + Duration::hours(24), ttl));

        // updating does not extend the lifetime
        draft.update(Cart::default(), created + Duration::hours(20));
        assert_eq!(draft.expires_at(ttl), created + ttl);
        assert_eq!(draft_expiry_cutoff(created + ttl, ttl), created);
    }
}
