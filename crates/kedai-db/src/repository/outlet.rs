//! # Outlet Repository
//!
//! Outlets and product categories. Both are small reference tables read
//! on almost every request.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use kedai_core::{Category, Outlet};

#[derive(Debug, Clone)]
pub struct OutletRepository {
    pool: SqlitePool,
}

impl OutletRepository {
    /// Creates a new OutletRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutletRepository { pool }
    }

    /// Inserts an outlet.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, outlet: &Outlet) -> DbResult<()> {
        debug!(id = %outlet.id, name = %outlet.name, "Inserting outlet");

        sqlx::query("INSERT INTO outlets (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&outlet.id)
            .bind(&outlet.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Outlet>> {
        let outlet = sqlx::query_as::<_, Outlet>("SELECT id, name FROM outlets WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(outlet)
    }

    pub async fn list(&self) -> DbResult<Vec<Outlet>> {
        let outlets = sqlx::query_as::<_, Outlet>("SELECT id, name FROM outlets ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(outlets)
    }

    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        debug!(id = %category.id, "Inserting category");

        sqlx::query("INSERT INTO categories (id, name) VALUES (?1, ?2)")
            .bind(&category.id)
            .bind(&category.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }
}
