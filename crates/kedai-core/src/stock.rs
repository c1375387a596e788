//! # Stock Guard
//!
//! Checks a cart against a stock snapshot before checkout, and describes the
//! decrements the database must apply when the sale is committed.
//!
//! ## Two-Step Protection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. check_availability(cart, snapshot)          (pure, this module)    │
//! │     fast rejection with a friendly message                              │
//! │                                                                         │
//! │  2. UPDATE product_variants                     (kedai-db, in the       │
//! │        SET stock = stock - ?                     checkout transaction)  │
//! │      WHERE id = ? AND track_stock = 1                                   │
//! │        AND stock >= ?                                                   │
//! │     zero rows → conflict, the whole sale rolls back                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 1 alone is racy; step 2 is what keeps stock from going negative.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartLine};
use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// Current stock per tracked variant id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot(HashMap<String, i64>);

impl StockSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every tracked variant of `products`.
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        let stock = products
            .into_iter()
            .flat_map(|p| p.variants.iter())
            .filter(|v| v.track_stock)
            .map(|v| (v.id.clone(), v.stock))
            .collect();
        StockSnapshot(stock)
    }

    pub fn set(&mut self, variant_id: &str, stock: i64) {
        self.0.insert(variant_id.to_string(), stock);
    }

    /// Stock for a variant; unknown variants have none.
    pub fn available(&self, variant_id: &str) -> i64 {
        self.0.get(variant_id).copied().unwrap_or(0)
    }
}

impl FromIterator<(String, i64)> for StockSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        StockSnapshot(iter.into_iter().collect())
    }
}

/// One conditional decrement to apply at commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecrement {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
}

/// Requested quantity per tracked variant, in first-seen order.
fn tracked_demand(lines: &[CartLine]) -> Vec<(&CartLine, i64)> {
    let mut demand: Vec<(&CartLine, i64)> = Vec::new();
    for line in lines.iter().filter(|l| l.track_stock) {
        match demand.iter_mut().find(|(l, _)| l.variant_id == line.variant_id) {
            Some((_, qty)) => *qty += line.quantity,
            None => demand.push((line, line.quantity)),
        }
    }
    demand
}

/// Fails on the first tracked variant whose total requested quantity
/// exceeds the snapshot. Untracked lines are never limited.
pub fn check_availability(cart: &Cart, snapshot: &StockSnapshot) -> CoreResult<()> {
    for (line, requested) in tracked_demand(&cart.lines) {
        let available = snapshot.available(&line.variant_id);
        if requested > available {
            return Err(CoreError::InsufficientStock {
                product: format!("{} ({})", line.product_name, line.variant_name),
                variant_id: line.variant_id.clone(),
                available,
                requested,
            });
        }
    }
    Ok(())
}

/// The decrements a successful sale must apply: one per tracked variant.
pub fn decrement_plan(cart: &Cart) -> Vec<StockDecrement> {
    tracked_demand(&cart.lines)
        .into_iter()
        .map(|(line, quantity)| StockDecrement {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            quantity,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::OrderChannel;

    fn line(variant: &str, qty: i64, tracked: bool) -> CartLine {
        CartLine {
            product_id: "kopi".to_string(),
            product_name: "Es Kopi Susu".to_string(),
            category_id: "coffee".to_string(),
            variant_id: variant.to_string(),
            variant_name: variant.to_uppercase(),
            base_price: Money::from_units(18_000),
            unit_price: Money::from_units(18_000),
            quantity: qty,
            track_stock: tracked,
        }
    }

    fn cart(lines: Vec<CartLine>) -> Cart {
        Cart {
            channel: OrderChannel::InStore,
            lines,
        }
    }

    #[test]
    fn test_enough_stock_passes() {
        let snapshot: StockSnapshot = [("r".to_string(), 5)].into_iter().collect();
        assert!(check_availability(&cart(vec![line("r", 5, true)]), &snapshot).is_ok());
    }

    #[test]
    fn test_short_stock_fails() {
        let snapshot: StockSnapshot = [("r".to_string(), 3)].into_iter().collect();
        let err = check_availability(&cart(vec![line("r", 5, true)]), &snapshot).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                product,
                variant_id,
                available,
                requested,
            } => {
                assert_eq!(product, "Es Kopi Susu (R)");
                assert_eq!(variant_id, "r");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_quantities_aggregate_across_lines() {
        let snapshot: StockSnapshot = [("r".to_string(), 4)].into_iter().collect();
        let c = cart(vec![line("r", 2, true), line("r", 3, true)]);
        assert!(matches!(
            check_availability(&c, &snapshot),
            Err(CoreError::InsufficientStock { requested: 5, available: 4, .. })
        ));

        let plan = decrement_plan(&c);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].quantity, 5);
    }

    #[test]
    fn test_missing_snapshot_entry_counts_as_zero() {
        let c = cart(vec![line("r", 1, true)]);
        assert!(matches!(
            check_availability(&c, &StockSnapshot::new()),
            Err(CoreError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_untracked_lines_are_unlimited() {
        let c = cart(vec![line("l", 500, false)]);
        assert!(check_availability(&c, &StockSnapshot::new()).is_ok());
        assert!(decrement_plan(&c).is_empty());
    }

    #[test]
    fn test_snapshot_from_products_skips_untracked() {
        use crate::types::{Product, ProductVariant};

        let product = Product {
            id: "kopi".to_string(),
            name: "Es Kopi Susu".to_string(),
            category_id: "coffee".to_string(),
            variants: vec![
                ProductVariant {
                    id: "r".to_string(),
                    name: "Regular".to_string(),
                    base_price: Money::from_units(18_000),
                    cost_price: Money::zero(),
                    track_stock: true,
                    stock: 7,
                },
                ProductVariant {
                    id: "l".to_string(),
                    name: "Large".to_string(),
                    base_price: Money::from_units(22_000),
                    cost_price: Money::zero(),
                    track_stock: false,
                    stock: 99,
                },
            ],
            outlet_id: None,
            is_active: true,
        };

        let snapshot = StockSnapshot::from_products([&product]);
        assert_eq!(snapshot.available("r"), 7);
        assert_eq!(snapshot.available("l"), 0);
    }
}
