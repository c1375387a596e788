//! # Schema Migrations
//!
//! The schema lives in `migrations/sqlite/` at the workspace root and is
//! compiled into the crate, so a till binary carries its own schema:
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   outlets, catalog, discount rules, customers,
//!                              cashier sessions, transactions, expenses,
//!                              draft carts
//! ```
//!
//! Files are applied once each, in name order, and recorded in
//! `_sqlx_migrations`. An applied file must never be edited; schema
//! changes go into a new `NNN_*.sql`.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(known = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}
