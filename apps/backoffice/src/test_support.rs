//! Fixtures shared by the command tests.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use kedai_core::{
    Actor, Category, DiscountAudience, DiscountRule, DiscountScope, DiscountValue, Money, Outlet,
    Percentage, Product, ProductVariant, Role,
};
use kedai_db::{Database, DbConfig};

use crate::{AppConfig, AppState};

/// 2024-03-09 12:00 in UTC+7.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 5, 0, 0).unwrap()
}

pub fn owner() -> Actor {
    Actor {
        user_id: "owner-1".to_string(),
        name: "Bu Rina".to_string(),
        role: Role::Owner,
        outlet_id: Some("outlet-1".to_string()),
    }
}

pub fn cashier(id: &str) -> Actor {
    Actor {
        user_id: id.to_string(),
        name: format!("Kasir {}", id),
        role: Role::Cashier,
        outlet_id: Some("outlet-1".to_string()),
    }
}

fn variant(id: &str, name: &str, price: i64, track_stock: bool, stock: i64) -> ProductVariant {
    ProductVariant {
        id: id.to_string(),
        name: name.to_string(),
        base_price: Money::from_units(price),
        cost_price: Money::from_units(price / 2),
        track_stock,
        stock,
    }
}

fn product(
    id: &str,
    name: &str,
    category: &str,
    outlet: Option<&str>,
    variants: Vec<ProductVariant>,
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        category_id: category.to_string(),
        variants,
        outlet_id: outlet.map(str::to_string),
        is_active: true,
    }
}

/// A rule valid since the start of 2024 with no other conditions.
pub fn rule(id: &str, value: DiscountValue) -> DiscountRule {
    DiscountRule {
        id: id.to_string(),
        name: format!("Promo {}", id),
        is_active: true,
        valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        valid_until: None,
        audience: DiscountAudience::Everyone,
        value,
        min_purchase: None,
        scope: DiscountScope::EntireOrder,
        bundle_product_ids: Vec::new(),
    }
}

pub fn percent_off(pct: u32, cap: Option<i64>) -> DiscountValue {
    DiscountValue::Percentage {
        rate: Percentage::from_whole(pct),
        cap: cap.map(Money::from_units),
    }
}

/// Two outlets and a small menu:
///
/// - `kopi`: `kopi-reg` 18,000 (stock 10), `kopi-lrg` 22,000 (stock 5)
/// - `teh`: `teh-reg` 8,000, untracked
/// - `nasi`: `nasi-box` 50,000, untracked
/// - `roti`: `roti-bakar` 15,000, untracked, `outlet-2` only
///
/// GoFood carries a 20% markup. The clock is pinned to [`noon`].
pub async fn app() -> AppState {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    db.outlets()
        .insert(&Outlet {
            id: "outlet-1".to_string(),
            name: "Kedai Kopi Senja".to_string(),
        })
        .await
        .unwrap();
    db.outlets()
        .insert(&Outlet {
            id: "outlet-2".to_string(),
            name: "Warung Pojok".to_string(),
        })
        .await
        .unwrap();
    for (id, name) in [("drinks", "Minuman"), ("food", "Makanan")] {
        db.outlets()
            .insert_category(&Category {
                id: id.to_string(),
                name: name.to_string(),
            })
            .await
            .unwrap();
    }

    let menu = [
        product(
            "kopi",
            "Kopi Susu",
            "drinks",
            None,
            vec![
                variant("kopi-reg", "Regular", 18_000, true, 10),
                variant("kopi-lrg", "Large", 22_000, true, 5),
            ],
        ),
        product(
            "teh",
            "Es Teh",
            "drinks",
            None,
            vec![variant("teh-reg", "Regular", 8_000, false, 0)],
        ),
        product(
            "nasi",
            "Nasi Ayam",
            "food",
            None,
            vec![variant("nasi-box", "Box", 50_000, false, 0)],
        ),
        product(
            "roti",
            "Roti Bakar",
            "food",
            Some("outlet-2"),
            vec![variant("roti-bakar", "Coklat", 15_000, false, 0)],
        ),
    ];
    for item in &menu {
        db.products().insert(item).await.unwrap();
    }

    let config = AppConfig::from_toml_str(
        r#"
        [store]
        name = "Kedai Kopi Senja"

        [pricing.markups]
        gofood = 20
        "#,
    )
    .unwrap();

    AppState::with_database(db, config).with_clock(Arc::new(noon))
}
