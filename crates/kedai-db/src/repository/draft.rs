//! # Draft Cart Repository
//!
//! Parked carts, one per owner, stored as JSON. Expiry is decided by the
//! caller through a cut-off timestamp: a draft created at or before the
//! cut-off is expired.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use kedai_core::DraftCart;

#[derive(Debug, sqlx::FromRow)]
struct DraftRow {
    id: String,
    owner_id: String,
    outlet_id: String,
    cart: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DraftRow> for DraftCart {
    type Error = crate::error::DbError;

    fn try_from(row: DraftRow) -> Result<Self, Self::Error> {
        Ok(DraftCart {
            id: row.id,
            owner_id: row.owner_id,
            outlet_id: row.outlet_id,
            cart: serde_json::from_str(&row.cart)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DraftCartRepository {
    pool: SqlitePool,
}

impl DraftCartRepository {
    /// Creates a new DraftCartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DraftCartRepository { pool }
    }

    /// Stores the owner's draft, replacing any previous one.
    pub async fn save(&self, draft: &DraftCart) -> DbResult<()> {
        debug!(
            owner_id = %draft.owner_id,
            lines = draft.cart.line_count(),
            "Saving draft cart"
        );

        let cart = serde_json::to_string(&draft.cart)
            .map_err(|e| crate::error::DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO draft_carts (id, owner_id, outlet_id, cart, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(owner_id) DO UPDATE SET
                id = excluded.id,
                outlet_id = excluded.outlet_id,
                cart = excluded.cart,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&draft.id)
        .bind(&draft.owner_id)
        .bind(&draft.outlet_id)
        .bind(cart)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The owner's draft if it was created after `cutoff`.
    pub async fn load(&self, owner_id: &str, cutoff: DateTime<Utc>) -> DbResult<Option<DraftCart>> {
        let row = sqlx::query_as::<_, DraftRow>(
            r#"
            SELECT id, owner_id, outlet_id, cart, created_at, updated_at
            FROM draft_carts
            WHERE owner_id = ?1 AND created_at > ?2
            "#,
        )
        .bind(owner_id)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DraftCart::try_from).transpose()
    }

    /// Removes the owner's draft. Returns whether one existed.
    pub async fn discard(&self, owner_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM draft_carts WHERE owner_id = ?1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every draft created at or before `cutoff`.
    pub async fn reap_expired(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM draft_carts WHERE created_at <= ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let reaped = result.rows_affected();
        if reaped > 0 {
            info!(reaped, "Reaped expired draft carts");
        }
        Ok(reaped)
    }
}
