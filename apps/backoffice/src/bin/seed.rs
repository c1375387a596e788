//! # Seed Data Generator
//!
//! Populates a development database with two outlets, a coffee-shop menu
//! and a few discount rules.
//!
//! ## Usage
//! ```bash
//! cargo run -p kedai-backoffice --bin kedai-seed
//!
//! # Specify database path
//! cargo run -p kedai-backoffice --bin kedai-seed -- --db ./data/kedai.db
//! ```

use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use kedai_core::{
    Category, DiscountAudience, DiscountRule, DiscountScope, DiscountValue, Money, Outlet,
    Percentage, Product, ProductVariant,
};
use kedai_db::{Database, DbConfig};

const OUTLETS: &[(&str, &str)] = &[
    ("outlet-senja", "Kedai Kopi Senja"),
    ("outlet-pojok", "Warung Pojok"),
];

const CATEGORIES: &[(&str, &str)] = &[
    ("coffee", "Kopi"),
    ("non-coffee", "Non Kopi"),
    ("food", "Makanan"),
    ("snack", "Camilan"),
];

/// (category, name, [(variant, base price)], tracked stock)
type MenuItem = (&'static str, &'static str, &'static [(&'static str, i64)], Option<i64>);

const MENU: &[MenuItem] = &[
    ("coffee", "Kopi Susu Gula Aren", &[("Regular", 18_000), ("Large", 22_000)], None),
    ("coffee", "Americano", &[("Hot", 15_000), ("Iced", 17_000)], None),
    ("coffee", "Cafe Latte", &[("Regular", 22_000), ("Large", 26_000)], None),
    ("coffee", "Kopi Tubruk", &[("Regular", 10_000)], None),
    ("non-coffee", "Es Teh Manis", &[("Regular", 8_000), ("Jumbo", 12_000)], None),
    ("non-coffee", "Matcha Latte", &[("Regular", 24_000)], None),
    ("non-coffee", "Coklat Panas", &[("Regular", 20_000)], None),
    ("food", "Nasi Ayam Geprek", &[("Box", 25_000)], Some(40)),
    ("food", "Mie Goreng Jawa", &[("Porsi", 22_000)], Some(30)),
    ("food", "Nasi Goreng Kampung", &[("Porsi", 23_000)], Some(30)),
    ("snack", "Pisang Goreng", &[("5 pcs", 12_000)], Some(25)),
    ("snack", "Roti Bakar", &[("Coklat", 15_000), ("Keju", 17_000)], Some(20)),
    ("snack", "Kentang Goreng", &[("Regular", 14_000)], None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./kedai_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kedai POS Seed Data Generator");
                println!();
                println!("Usage: kedai-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./kedai_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kedai POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (id, name) in OUTLETS {
        let outlet = Outlet {
            id: id.to_string(),
            name: name.to_string(),
        };
        db.outlets().insert(&outlet).await?;
        println!("✓ Outlet {} ({})", outlet.name, outlet.code());
    }

    for (id, name) in CATEGORIES {
        db.outlets()
            .insert_category(&Category {
                id: id.to_string(),
                name: name.to_string(),
            })
            .await?;
    }
    println!("✓ {} categories", CATEGORIES.len());

    for (idx, (category, name, variants, stock)) in MENU.iter().enumerate() {
        let product = menu_product(idx, category, name, variants, *stock);
        db.products().insert(&product).await?;
    }
    println!("✓ {} products", MENU.len());

    for rule in discount_rules() {
        db.discount_rules().insert(&rule).await?;
        println!("✓ Discount rule: {}", rule.name);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn menu_product(
    idx: usize,
    category: &str,
    name: &str,
    variants: &[(&str, i64)],
    stock: Option<i64>,
) -> Product {
    let product_id = format!("prd-{:03}", idx + 1);

    Product {
        variants: variants
            .iter()
            .enumerate()
            .map(|(v, (variant, price))| ProductVariant {
                id: format!("{}-{}", product_id, v + 1),
                name: variant.to_string(),
                base_price: Money::from_units(*price),
                // roughly 40% food cost
                cost_price: Money::from_units(price * 2 / 5).round_to_nearest(100),
                track_stock: stock.is_some(),
                stock: stock.unwrap_or(0),
            })
            .collect(),
        id: product_id,
        name: name.to_string(),
        category_id: category.to_string(),
        // only sold at the second outlet
        outlet_id: (name == "Roti Bakar").then(|| "outlet-pojok".to_string()),
        is_active: true,
    }
}

fn discount_rules() -> Vec<DiscountRule> {
    let now = Utc::now();

    vec![
        DiscountRule {
            id: Uuid::new_v4().to_string(),
            name: "Happy Hour Kopi 15%".to_string(),
            is_active: true,
            valid_from: now,
            valid_until: Some(now + Duration::days(30)),
            audience: DiscountAudience::Everyone,
            value: DiscountValue::Percentage {
                rate: Percentage::from_whole(15),
                cap: Some(Money::from_units(10_000)),
            },
            min_purchase: None,
            scope: DiscountScope::Category {
                category_id: "coffee".to_string(),
            },
            bundle_product_ids: Vec::new(),
        },
        DiscountRule {
            id: Uuid::new_v4().to_string(),
            name: "Member Hemat 10rb".to_string(),
            is_active: true,
            valid_from: now,
            valid_until: None,
            audience: DiscountAudience::MembersOnly,
            value: DiscountValue::FixedAmount {
                amount: Money::from_units(10_000),
            },
            min_purchase: Some(Money::from_units(75_000)),
            scope: DiscountScope::EntireOrder,
            bundle_product_ids: Vec::new(),
        },
        DiscountRule {
            id: Uuid::new_v4().to_string(),
            name: "Paket Ngopi Pagi".to_string(),
            is_active: true,
            valid_from: now,
            valid_until: None,
            audience: DiscountAudience::Everyone,
            value: DiscountValue::FixedAmount {
                amount: Money::from_units(5_000),
            },
            min_purchase: None,
            scope: DiscountScope::EntireOrder,
            bundle_product_ids: vec!["prd-001".to_string(), "prd-011".to_string()],
        },
    ]
}
