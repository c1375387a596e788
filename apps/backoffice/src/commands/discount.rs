//! # Discount Rule Commands
//!
//! Owner-only management of the discount rules checkout chooses from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kedai_core::validation::validate_discount_rule;
use kedai_core::{
    Actor, CoreError, DiscountAudience, DiscountRule, DiscountScope, DiscountValue, Money,
};
use kedai_db::DbError;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Editable fields of a discount rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRuleInput {
    pub name: String,
    /// Defaults to now when creating.
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub audience: DiscountAudience,
    pub value: DiscountValue,
    #[serde(default)]
    pub min_purchase: Option<Money>,
    pub scope: DiscountScope,
    #[serde(default)]
    pub bundle_product_ids: Vec<String>,
}

impl DiscountRuleInput {
    fn into_rule(self, id: String, is_active: bool, valid_from: DateTime<Utc>) -> DiscountRule {
        DiscountRule {
            id,
            name: self.name.trim().to_string(),
            is_active,
            valid_from: self.valid_from.unwrap_or(valid_from),
            valid_until: self.valid_until,
            audience: self.audience,
            value: self.value,
            min_purchase: self.min_purchase,
            scope: self.scope,
            bundle_product_ids: self.bundle_product_ids,
        }
    }
}

fn not_found(id: &str) -> impl FnOnce(DbError) -> ApiError + '_ {
    move |err| match err {
        DbError::NotFound { .. } => CoreError::DiscountRuleNotFound(id.to_string()).into(),
        other => other.into(),
    }
}

pub async fn create_discount_rule(
    state: &AppState,
    actor: &Actor,
    input: DiscountRuleInput,
) -> ApiResult<DiscountRule> {
    actor.capabilities().require_manage_discounts()?;

    let rule = input.into_rule(uuid::Uuid::new_v4().to_string(), true, state.now());
    validate_discount_rule(&rule)?;

    state.db.discount_rules().insert(&rule).await?;
    info!(id = %rule.id, name = %rule.name, by = %actor.user_id, "Discount rule created");
    Ok(rule)
}

/// Replaces the rule's fields. The active flag is kept.
pub async fn update_discount_rule(
    state: &AppState,
    actor: &Actor,
    id: &str,
    input: DiscountRuleInput,
) -> ApiResult<DiscountRule> {
    actor.capabilities().require_manage_discounts()?;

    let existing = state
        .db
        .discount_rules()
        .get_by_id(id)
        .await?
        .ok_or_else(|| CoreError::DiscountRuleNotFound(id.to_string()))?;

    let rule = input.into_rule(existing.id, existing.is_active, existing.valid_from);
    validate_discount_rule(&rule)?;

    state
        .db
        .discount_rules()
        .update(&rule)
        .await
        .map_err(not_found(id))?;
    info!(id = %rule.id, by = %actor.user_id, "Discount rule updated");
    Ok(rule)
}

pub async fn deactivate_discount_rule(state: &AppState, actor: &Actor, id: &str) -> ApiResult<()> {
    actor.capabilities().require_manage_discounts()?;

    state
        .db
        .discount_rules()
        .set_active(id, false)
        .await
        .map_err(not_found(id))?;
    info!(id = %id, by = %actor.user_id, "Discount rule deactivated");
    Ok(())
}

pub async fn delete_discount_rule(state: &AppState, actor: &Actor, id: &str) -> ApiResult<()> {
    actor.capabilities().require_manage_discounts()?;

    state
        .db
        .discount_rules()
        .delete(id)
        .await
        .map_err(not_found(id))?;
    info!(id = %id, by = %actor.user_id, "Discount rule deleted");
    Ok(())
}

/// Every rule, active or not.
pub async fn list_discount_rules(state: &AppState, actor: &Actor) -> ApiResult<Vec<DiscountRule>> {
    actor.capabilities().require_manage_discounts()?;

    let rules = state.db.discount_rules().list_all().await?;
    debug!(count = rules.len(), "Listed discount rules");
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{app, cashier, noon, owner, percent_off};

    fn input(name: &str) -> DiscountRuleInput {
        DiscountRuleInput {
            name: name.to_string(),
            valid_from: None,
            valid_until: None,
            audience: DiscountAudience::Everyone,
            value: percent_off(10, Some(5_000)),
            min_purchase: None,
            scope: DiscountScope::EntireOrder,
            bundle_product_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_owner_manages_rules() {
        let state = app().await;

        let rule = create_discount_rule(&state, &owner(), input(" Promo Gajian "))
            .await
            .unwrap();
        assert_eq!(rule.name, "Promo Gajian");
        assert_eq!(rule.valid_from, noon());
        assert!(rule.is_active);

        let mut changed = input("Promo Gajian");
        changed.scope = DiscountScope::Category {
            category_id: "drinks".to_string(),
        };
        let updated = update_discount_rule(&state, &owner(), &rule.id, changed)
            .await
            .unwrap();
        assert_eq!(updated.valid_from, noon());

        deactivate_discount_rule(&state, &owner(), &rule.id).await.unwrap();
        assert!(state.db.discount_rules().list_active().await.unwrap().is_empty());

        let listed = list_discount_rules(&state, &owner()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_active);
        assert_eq!(listed[0].scope, updated.scope);

        delete_discount_rule(&state, &owner(), &rule.id).await.unwrap();
        let err = delete_discount_rule(&state, &owner(), &rule.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_cashier_cannot_write_rules() {
        let state = app().await;

        let err = create_discount_rule(&state, &cashier("c1"), input("Diskon"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = list_discount_rules(&state, &cashier("c1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(state.db.discount_rules().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rule_rejected() {
        let state = app().await;

        let mut zero = input("Nol");
        zero.value = DiscountValue::FixedAmount {
            amount: Money::zero(),
        };
        let err = create_discount_rule(&state, &owner(), zero).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let mut backwards = input("Mundur");
        backwards.valid_from = Some(noon());
        backwards.valid_until = Some(noon() - chrono::Duration::days(1));
        let err = create_discount_rule(&state, &owner(), backwards)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = update_discount_rule(&state, &owner(), "missing", input("X"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
