//! Fixtures shared by the repository tests.

use chrono::{DateTime, TimeZone, Utc};
use kedai_core::{
    assemble, Cart, CartLine, Category, CheckoutContext, CheckoutRequest, Money, OrderChannel,
    Outlet, PaymentMethod, Product, ProductVariant, Transaction,
};

use crate::pool::{Database, DbConfig};

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub fn outlet() -> Outlet {
    Outlet {
        id: "outlet-1".to_string(),
        name: "Kedai Kopi Senja".to_string(),
    }
}

pub fn category() -> Category {
    Category {
        id: "drinks".to_string(),
        name: "Minuman".to_string(),
    }
}

pub fn variant(id: &str, price: i64, track_stock: bool, stock: i64) -> ProductVariant {
    ProductVariant {
        id: id.to_string(),
        name: format!("Variant {}", id),
        base_price: Money::from_units(price),
        cost_price: Money::from_units(price / 2),
        track_stock,
        stock,
    }
}

pub fn product(id: &str, name: &str, variants: Vec<ProductVariant>) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        category_id: "drinks".to_string(),
        variants,
        outlet_id: None,
        is_active: true,
    }
}

/// Outlet, one category, a tracked coffee (`kopi-reg`, stock 10) and an
/// untracked tea (`teh-reg`).
pub async fn seeded_db() -> Database {
    let db = memory_db().await;
    db.outlets().insert(&outlet()).await.unwrap();
    db.outlets().insert_category(&category()).await.unwrap();
    db.products()
        .insert(&product(
            "kopi",
            "Kopi Susu",
            vec![variant("kopi-reg", 18_000, true, 10), variant("kopi-lrg", 22_000, true, 5)],
        ))
        .await
        .unwrap();
    db.products()
        .insert(&product("teh", "Es Teh", vec![variant("teh-reg", 8_000, false, 0)]))
        .await
        .unwrap();
    db
}

/// 2024-03-09 12:00 in UTC+7.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 5, 0, 0).unwrap()
}

/// A sale of `quantity` tracked `kopi-reg` at 18,000 each.
pub fn kopi_sale(
    sequence: u32,
    quantity: i64,
    payment_method: PaymentMethod,
    session_id: Option<&str>,
    now: DateTime<Utc>,
) -> Transaction {
    let cart = Cart {
        channel: OrderChannel::InStore,
        lines: vec![CartLine {
            product_id: "kopi".to_string(),
            product_name: "Kopi Susu".to_string(),
            category_id: "drinks".to_string(),
            variant_id: "kopi-reg".to_string(),
            variant_name: "Variant kopi-reg".to_string(),
            base_price: Money::from_units(18_000),
            unit_price: Money::from_units(18_000),
            quantity,
            track_stock: true,
        }],
    };
    let total = cart.subtotal();
    let request = CheckoutRequest {
        cart,
        discount: None,
        payment_method,
        amount_tendered: payment_method.is_cash().then_some(total),
        cashier_id: "cashier-1".to_string(),
        member: None,
        customer_id: None,
        customer_name: None,
    };
    let outlet = outlet();
    let ctx = CheckoutContext {
        outlet: &outlet,
        sequence,
        now,
        utc_offset_minutes: 420,
        cashier_session_id: session_id.map(str::to_string),
    };
    assemble(&request, &ctx).unwrap()
}
