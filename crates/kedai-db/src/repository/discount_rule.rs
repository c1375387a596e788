//! # Discount Rule Repository
//!
//! Discount rules are stored flat: `kind` + `value` (+ optional cap) for
//! the amount, `scope` + `target_id` for what the rule applies to, and the
//! bundle as a JSON array of product ids.
//!
//! ```text
//! kind          value   max_discount_amount   meaning
//! ───────────   ─────   ───────────────────   ─────────────────────────
//! percentage     1000   5000                  10 %, at most 5,000
//! fixed_amount  15000   NULL                  15,000 off
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kedai_core::{
    DiscountAudience, DiscountKind, DiscountRule, DiscountScope, DiscountScopeKind,
    DiscountValue, Money,
};

#[derive(Debug, sqlx::FromRow)]
struct DiscountRuleRow {
    id: String,
    name: String,
    is_active: bool,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    audience: DiscountAudience,
    kind: DiscountKind,
    value: i64,
    max_discount_amount: Option<i64>,
    min_purchase: Option<i64>,
    scope: DiscountScopeKind,
    target_id: Option<String>,
    bundle_product_ids: String,
}

impl TryFrom<DiscountRuleRow> for DiscountRule {
    type Error = DbError;

    fn try_from(row: DiscountRuleRow) -> Result<Self, Self::Error> {
        let value = DiscountValue::from_parts(
            row.kind,
            row.value,
            row.max_discount_amount.map(Money::from_units),
        )
        .map_err(|e| DbError::decode("DiscountRule", e))?;
        let scope = DiscountScope::from_parts(row.scope, row.target_id)
            .map_err(|e| DbError::decode("DiscountRule", e))?;
        let bundle_product_ids: Vec<String> = serde_json::from_str(&row.bundle_product_ids)?;

        Ok(DiscountRule {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            audience: row.audience,
            value,
            min_purchase: row.min_purchase.map(Money::from_units),
            scope,
            bundle_product_ids,
        })
    }
}

const RULE_COLUMNS: &str = r#"
    id, name, is_active, valid_from, valid_until, audience,
    kind, value, max_discount_amount, min_purchase,
    scope, target_id, bundle_product_ids
"#;

#[derive(Debug, Clone)]
pub struct DiscountRuleRepository {
    pool: SqlitePool,
}

impl DiscountRuleRepository {
    /// Creates a new DiscountRuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRuleRepository { pool }
    }

    /// Inserts a rule. Validation happens before this call.
    pub async fn insert(&self, rule: &DiscountRule) -> DbResult<()> {
        debug!(id = %rule.id, name = %rule.name, "Inserting discount rule");

        let (kind, value, cap) = rule.value.to_parts();
        let bundle = serde_json::to_string(&rule.bundle_product_ids)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO discount_rules (
                id, name, is_active, valid_from, valid_until, audience,
                kind, value, max_discount_amount, min_purchase,
                scope, target_id, bundle_product_ids, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(rule.is_active)
        .bind(rule.valid_from)
        .bind(rule.valid_until)
        .bind(rule.audience)
        .bind(kind)
        .bind(value)
        .bind(cap)
        .bind(rule.min_purchase)
        .bind(rule.scope.kind())
        .bind(rule.scope.target_id())
        .bind(bundle)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces every field of an existing rule.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no rule with this id
    pub async fn update(&self, rule: &DiscountRule) -> DbResult<()> {
        debug!(id = %rule.id, "Updating discount rule");

        let (kind, value, cap) = rule.value.to_parts();
        let bundle = serde_json::to_string(&rule.bundle_product_ids)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE discount_rules SET
                name = ?2,
                is_active = ?3,
                valid_from = ?4,
                valid_until = ?5,
                audience = ?6,
                kind = ?7,
                value = ?8,
                max_discount_amount = ?9,
                min_purchase = ?10,
                scope = ?11,
                target_id = ?12,
                bundle_product_ids = ?13,
                updated_at = ?14
            WHERE id = ?1
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(rule.is_active)
        .bind(rule.valid_from)
        .bind(rule.valid_until)
        .bind(rule.audience)
        .bind(kind)
        .bind(value)
        .bind(cap)
        .bind(rule.min_purchase)
        .bind(rule.scope.kind())
        .bind(rule.scope.target_id())
        .bind(bundle)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountRule", &rule.id));
        }

        Ok(())
    }

    /// Activates or deactivates a rule without touching the rest.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        debug!(id = %id, is_active, "Setting discount rule active flag");

        let result =
            sqlx::query("UPDATE discount_rules SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(is_active)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountRule", id));
        }

        Ok(())
    }

    /// Deletes a rule. Past transactions keep the rule's name and amount.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting discount rule");

        let result = sqlx::query("DELETE FROM discount_rules WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountRule", id));
        }

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiscountRule>> {
        let row = sqlx::query_as::<_, DiscountRuleRow>(&format!(
            "SELECT {} FROM discount_rules WHERE id = ?1",
            RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DiscountRule::try_from).transpose()
    }

    /// Every rule, active or not, newest validity first.
    pub async fn list_all(&self) -> DbResult<Vec<DiscountRule>> {
        let rows = sqlx::query_as::<_, DiscountRuleRow>(&format!(
            "SELECT {} FROM discount_rules ORDER BY valid_from DESC, name",
            RULE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DiscountRule::try_from).collect()
    }

    /// Rules flagged active. Validity windows are checked by the evaluator,
    /// which knows `now`.
    pub async fn list_active(&self) -> DbResult<Vec<DiscountRule>> {
        let rows = sqlx::query_as::<_, DiscountRuleRow>(&format!(
            "SELECT {} FROM discount_rules WHERE is_active = 1 ORDER BY name, id",
            RULE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded active discount rules");
        rows.into_iter().map(DiscountRule::try_from).collect()
    }
}
