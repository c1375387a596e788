//! # Catalog Commands
//!
//! The priced menu for a register, plus owner-only stock and availability
//! changes.

use serde::Serialize;
use tracing::info;

use kedai_core::validation::validate_positive_amount;
use kedai_core::{Actor, CoreError, Money, OrderChannel};
use kedai_db::DbError;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// One sellable variant as shown on the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub product_id: String,
    pub product_name: String,
    pub category_id: String,
    pub variant_id: String,
    pub variant_name: String,
    /// Price on the requested channel.
    pub price: Money,
    pub track_stock: bool,
    pub stock: i64,
}

/// Active products at the outlet, priced for `channel` (in-store when absent).
pub async fn list_menu(
    state: &AppState,
    actor: &Actor,
    outlet_id: Option<&str>,
    channel: Option<&str>,
) -> ApiResult<Vec<MenuEntry>> {
    let outlet_id = actor.resolve_outlet(outlet_id)?;
    let channel = match channel {
        Some(slug) => slug.parse::<OrderChannel>()?,
        None => OrderChannel::InStore,
    };

    let products = state.db.products().list_for_outlet(&outlet_id).await?;

    Ok(products
        .iter()
        .flat_map(|product| {
            product.variants.iter().map(|variant| MenuEntry {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                category_id: product.category_id.clone(),
                variant_id: variant.id.clone(),
                variant_name: variant.name.clone(),
                price: state.prices().price_for(variant, &channel),
                track_stock: variant.track_stock,
                stock: variant.stock,
            })
        })
        .collect())
}

pub async fn set_product_active(
    state: &AppState,
    actor: &Actor,
    product_id: &str,
    is_active: bool,
) -> ApiResult<()> {
    actor.capabilities().require_manage_catalog()?;

    state
        .db
        .products()
        .set_active(product_id, is_active)
        .await
        .map_err(|err| -> ApiError {
            match err {
                DbError::NotFound { .. } => CoreError::ProductNotFound(product_id.to_string()).into(),
                other => other.into(),
            }
        })
}

/// Adds received stock to a tracked variant.
pub async fn restock(
    state: &AppState,
    actor: &Actor,
    variant_id: &str,
    quantity: i64,
) -> ApiResult<i64> {
    actor.capabilities().require_manage_catalog()?;
    validate_positive_amount("quantity", Money::from_units(quantity))?;

    state.db.products().restock(variant_id, quantity).await?;
    let stock = state.db.products().current_stock(variant_id).await?;

    info!(variant_id = %variant_id, quantity, stock, by = %actor.user_id, "Restocked");
    Ok(stock)
}

/// Removes spoiled or lost stock outside a sale.
pub async fn write_off_stock(
    state: &AppState,
    actor: &Actor,
    variant_id: &str,
    quantity: i64,
) -> ApiResult<i64> {
    actor.capabilities().require_manage_catalog()?;
    validate_positive_amount("quantity", Money::from_units(quantity))?;

    match state.db.products().decrement_stock(variant_id, quantity).await {
        Ok(()) => {}
        Err(DbError::StockConflict { .. }) => {
            let available = state.db.products().current_stock(variant_id).await?;
            return Err(CoreError::InsufficientStock {
                product: variant_id.to_string(),
                variant_id: variant_id.to_string(),
                available,
                requested: quantity,
            }
            .into());
        }
        Err(err) => return Err(err.into()),
    }

    let stock = state.db.products().current_stock(variant_id).await?;
    info!(variant_id = %variant_id, quantity, stock, by = %actor.user_id, "Stock written off");
    Ok(stock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{app, cashier, owner};

    #[tokio::test]
    async fn test_menu_priced_per_channel() {
        let state = app().await;

        let in_store = list_menu(&state, &cashier("c1"), None, None).await.unwrap();
        let kopi = in_store.iter().find(|e| e.variant_id == "kopi-reg").unwrap();
        assert_eq!(kopi.price, Money::from_units(18_000));
        // roti is only sold at outlet-2
        assert!(in_store.iter().all(|e| e.product_id != "roti"));

        let gofood = list_menu(&state, &cashier("c1"), None, Some("gofood")).await.unwrap();
        let kopi = gofood.iter().find(|e| e.variant_id == "kopi-reg").unwrap();
        assert_eq!(kopi.price, Money::from_units(21_500));

        let other = list_menu(&state, &owner(), Some("outlet-2"), None).await.unwrap();
        assert!(other.iter().any(|e| e.product_id == "roti"));
    }

    #[tokio::test]
    async fn test_owner_adjusts_stock() {
        let state = app().await;

        assert_eq!(restock(&state, &owner(), "kopi-lrg", 10).await.unwrap(), 15);
        assert_eq!(write_off_stock(&state, &owner(), "kopi-lrg", 4).await.unwrap(), 11);

        let err = write_off_stock(&state, &owner(), "kopi-lrg", 12).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(state.db.products().current_stock("kopi-lrg").await.unwrap(), 11);

        let err = restock(&state, &owner(), "kopi-lrg", 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_cashier_cannot_change_catalog() {
        let state = app().await;

        let err = restock(&state, &cashier("c1"), "kopi-lrg", 10).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = set_product_active(&state, &cashier("c1"), "kopi", false)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_deactivated_product_leaves_menu() {
        let state = app().await;

        set_product_active(&state, &owner(), "teh", false).await.unwrap();
        let menu = list_menu(&state, &owner(), None, None).await.unwrap();
        assert!(menu.iter().all(|e| e.product_id != "teh"));

        let err = set_product_active(&state, &owner(), "martabak", false)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
