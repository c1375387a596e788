//! # Product Repository
//!
//! Database operations for products, their variants and stock.
//!
//! ## Key Operations
//! - Catalog CRUD (product + variants written together)
//! - Stock snapshots for the stock guard
//! - Conditional stock decrements
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, check in memory, write absolute value                 │
//! │     UPDATE product_variants SET stock = 7 WHERE id = ?                 │
//! │                                                                         │
//! │  ✅ CORRECT: delta guarded by the current value                        │
//! │     UPDATE product_variants SET stock = stock - 3                      │
//! │     WHERE id = ? AND track_stock = 1 AND stock >= 3                    │
//! │                                                                         │
//! │  Till A: sells 3 of 4 → 1 row updated, stock 1                         │
//! │  Till B: sells 2 of 4 → 0 rows updated → StockConflict                 │
//! │  Stock never goes below zero, whoever commits first.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use kedai_core::{Money, Product, ProductVariant, StockDecrement, StockSnapshot};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category_id: String,
    outlet_id: Option<String>,
    is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: String,
    product_id: String,
    name: String,
    base_price: i64,
    cost_price: i64,
    track_stock: bool,
    stock: i64,
}

impl From<VariantRow> for ProductVariant {
    fn from(row: VariantRow) -> Self {
        ProductVariant {
            id: row.id,
            name: row.name,
            base_price: Money::from_units(row.base_price),
            cost_price: Money::from_units(row.cost_price),
            track_stock: row.track_stock,
            stock: row.stock,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, category_id, outlet_id, is_active";
const VARIANT_COLUMNS: &str =
    "id, product_id, name, base_price, cost_price, track_stock, stock";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let menu = repo.list_for_outlet("outlet-1").await?;
/// let snapshot = repo.stock_snapshot(&["kopi-reg".into()]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product together with its variants.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - product or variant id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, variants = product.variants.len(), "Inserting product");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, category_id, outlet_id, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(&product.outlet_id)
        .bind(product.is_active)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, variant) in product.variants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO product_variants (
                    id, product_id, name, base_price, cost_price,
                    track_stock, stock, sort_order
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&variant.id)
            .bind(&product.id)
            .bind(&variant.name)
            .bind(variant.base_price)
            .bind(variant.cost_price)
            .bind(variant.track_stock)
            .bind(variant.stock)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a product (with variants) by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_variants(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Gets several products at once. Unknown ids are skipped.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE id IN (",
            PRODUCT_COLUMNS
        ));
        let mut list = query.separated(", ");
        for id in ids {
            list.push_bind(id);
        }
        list.push_unseparated(") ORDER BY name");

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        self.attach_variants(rows).await
    }

    /// Active products sold at an outlet: its own plus the shared ones.
    pub async fn list_for_outlet(&self, outlet_id: &str) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {} FROM products
            WHERE is_active = 1 AND (outlet_id IS NULL OR outlet_id = ?1)
            ORDER BY name
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(outlet_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(outlet_id = %outlet_id, count = rows.len(), "Listed products for outlet");
        self.attach_variants(rows).await
    }

    /// Activates or deactivates a product.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        debug!(id = %id, is_active, "Setting product active flag");

        let result = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Current stock of the given tracked variants.
    ///
    /// Untracked or unknown variants are left out of the snapshot.
    pub async fn stock_snapshot(&self, variant_ids: &[String]) -> DbResult<StockSnapshot> {
        if variant_ids.is_empty() {
            return Ok(StockSnapshot::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, stock FROM product_variants WHERE track_stock = 1 AND id IN (",
        );
        let mut list = query.separated(", ");
        for id in variant_ids {
            list.push_bind(id);
        }
        list.push_unseparated(")");

        let rows: Vec<(String, i64)> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows.into_iter().collect())
    }

    /// Current stock of one variant.
    pub async fn current_stock(&self, variant_id: &str) -> DbResult<i64> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM product_variants WHERE id = ?1")
                .bind(variant_id)
                .fetch_optional(&self.pool)
                .await?;

        stock.ok_or_else(|| DbError::not_found("ProductVariant", variant_id))
    }

    /// Decrements stock outside a checkout (waste, manual correction).
    ///
    /// ## Returns
    /// * `Err(DbError::StockConflict)` - not enough stock, or the variant is untracked
    pub async fn decrement_stock(&self, variant_id: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        apply_decrement(
            &mut conn,
            &StockDecrement {
                product_id: String::new(),
                variant_id: variant_id.to_string(),
                quantity,
            },
        )
        .await
    }

    /// Adds received stock to a tracked variant.
    pub async fn restock(&self, variant_id: &str, quantity: i64) -> DbResult<()> {
        debug!(variant_id = %variant_id, quantity, "Restocking variant");

        let result = sqlx::query(
            "UPDATE product_variants SET stock = stock + ?2 WHERE id = ?1 AND track_stock = 1",
        )
        .bind(variant_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProductVariant", variant_id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Loads the variants of `rows` in one query, keeping row order.
    async fn attach_variants(&self, rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM product_variants WHERE product_id IN (",
            VARIANT_COLUMNS
        ));
        let mut list = query.separated(", ");
        for row in &rows {
            list.push_bind(&row.id);
        }
        list.push_unseparated(") ORDER BY product_id, sort_order");

        let variants = query
            .build_query_as::<VariantRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_product: HashMap<String, Vec<ProductVariant>> = HashMap::new();
        for variant in variants {
            by_product
                .entry(variant.product_id.clone())
                .or_default()
                .push(variant.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| Product {
                variants: by_product.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                category_id: row.category_id,
                outlet_id: row.outlet_id,
                is_active: row.is_active,
            })
            .collect())
    }
}

/// Applies one conditional decrement on `conn`.
///
/// Used both standalone and inside the checkout SQL transaction.
pub(crate) async fn apply_decrement(
    conn: &mut SqliteConnection,
    decrement: &StockDecrement,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE product_variants
        SET stock = stock - ?2
        WHERE id = ?1 AND track_stock = 1 AND stock >= ?2
        "#,
    )
    .bind(&decrement.variant_id)
    .bind(decrement.quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(
            variant_id = %decrement.variant_id,
            quantity = decrement.quantity,
            "Conditional stock decrement matched no row"
        );
        return Err(DbError::StockConflict {
            variant_id: decrement.variant_id.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{product, seeded_db, variant};

    #[tokio::test]
    async fn test_insert_and_get_with_variants() {
        let db = seeded_db().await;

        let kopi = db.products().get_by_id("kopi").await.unwrap().unwrap();
        assert_eq!(kopi.name, "Kopi Susu");
        let ids: Vec<&str> = kopi.variants.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["kopi-reg", "kopi-lrg"]);
        assert_eq!(kopi.variants[0].base_price, Money::from_units(18_000));

        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown() {
        let db = seeded_db().await;

        let found = db
            .products()
            .get_many(&["teh".to_string(), "kopi".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Es Teh", "Kopi Susu"]);
    }

    #[tokio::test]
    async fn test_list_for_outlet_filters() {
        let db = seeded_db().await;

        let mut local = product("roti", "Roti Bakar", vec![variant("roti-reg", 15_000, false, 0)]);
        local.outlet_id = Some("outlet-2".to_string());
        db.products().insert(&local).await.unwrap();
        db.products().set_active("teh", false).await.unwrap();

        let menu = db.products().list_for_outlet("outlet-1").await.unwrap();
        let names: Vec<&str> = menu.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Kopi Susu"]);

        let other = db.products().list_for_outlet("outlet-2").await.unwrap();
        assert_eq!(other.len(), 2);
    }

    #[tokio::test]
    async fn test_stock_snapshot_only_tracked() {
        let db = seeded_db().await;

        let snapshot = db
            .products()
            .stock_snapshot(&["kopi-reg".to_string(), "teh-reg".to_string()])
            .await
            .unwrap();
        assert_eq!(snapshot.available("kopi-reg"), 10);
        assert_eq!(snapshot.available("teh-reg"), 0);
    }

    #[tokio::test]
    async fn test_decrement_is_conditional() {
        let db = seeded_db().await;
        let products = db.products();

        products.decrement_stock("kopi-lrg", 3).await.unwrap();
        assert_eq!(products.current_stock("kopi-lrg").await.unwrap(), 2);

        let err = products.decrement_stock("kopi-lrg", 3).await.unwrap_err();
        assert!(matches!(err, DbError::StockConflict { .. }));
        assert_eq!(products.current_stock("kopi-lrg").await.unwrap(), 2);

        products.restock("kopi-lrg", 4).await.unwrap();
        assert_eq!(products.current_stock("kopi-lrg").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_set_active_missing_product() {
        let db = seeded_db().await;
        let err = db.products().set_active("ghost", false).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
