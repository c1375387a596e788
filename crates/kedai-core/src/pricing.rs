//! # Channel Pricing
//!
//! Resolves the unit price of a variant for an order channel.
//!
//! ## Price Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  channel == in_store ──────────────────────────► base_price            │
//! │                                                                         │
//! │  channel == delivery(slug)                                              │
//! │     markup = ChannelMarkups[slug] (missing → 0%)                       │
//! │     raw    = base × (1 + markup)              (exact, basis points)    │
//! │     price  = round raw to the nearest 500, halves up                   │
//! │                                                                         │
//! │  Example: base 18.000, gofood +20%                                     │
//! │     raw 21.600 → 21.500                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding happens once, on the unit price. Line totals are plain
//! `unit_price × quantity`.

use crate::money::Money;
use crate::types::{ChannelMarkups, OrderChannel, Percentage, ProductVariant};
use crate::PRICE_STEP;

/// Markups plus the rounding step: everything needed to price a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBook {
    pub markups: ChannelMarkups,
    pub step: i64,
}

impl PriceBook {
    pub fn new(markups: ChannelMarkups) -> Self {
        PriceBook {
            markups,
            step: PRICE_STEP,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Unit price of `variant` on `channel`.
    pub fn price_for(&self, variant: &ProductVariant, channel: &OrderChannel) -> Money {
        self.price_base(variant.base_price, channel)
    }

    /// Channel price for a raw base price (used when repricing cart lines).
    pub fn price_base(&self, base: Money, channel: &OrderChannel) -> Money {
        if channel.is_in_store() {
            base
        } else {
            apply_markup(base, self.markups.markup_for(channel), self.step)
        }
    }
}

impl Default for PriceBook {
    fn default() -> Self {
        PriceBook::new(ChannelMarkups::default())
    }
}

/// Resolves the unit price of `variant` sold through `channel`.
///
/// `markup` is ignored for in-store sales.
pub fn resolve_price(variant: &ProductVariant, channel: &OrderChannel, markup: Percentage) -> Money {
    resolve_price_with_step(variant, channel, markup, PRICE_STEP)
}

/// Same as [`resolve_price`] with a custom rounding step.
pub fn resolve_price_with_step(
    variant: &ProductVariant,
    channel: &OrderChannel,
    markup: Percentage,
    step: i64,
) -> Money {
    if channel.is_in_store() {
        return variant.base_price;
    }

    apply_markup(variant.base_price, markup, step)
}

/// `base × (1 + markup)` rounded to `step`, never negative.
pub fn apply_markup(base: Money, markup: Percentage, step: i64) -> Money {
    let scaled = base.units() as i128 * (10_000 + markup.bps() as i128);
    let step = step.max(1) as i128;
    // round(scaled / (10000 * step)) with halves up
    let denominator = 10_000 * step;
    let steps = (scaled + denominator / 2).div_euclid(denominator);
    Money::from_units((steps * step) as i64).non_negative()
}

// =============================================================================
// Unit Tests
// =============================================================================
