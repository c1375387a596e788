//! # Connection Pool
//!
//! One `SqlitePool` per process, shared by every repository.
//!
//! ```text
//!   till A ──checkout──┐
//!   till B ──checkout──┼──► SqlitePool ──► kedai.db (WAL)
//!   owner  ──close─────┘        │
//!                               └── one writer at a time; the others wait
//!                                   up to busy_timeout, then DbError::Busy
//! ```
//!
//! Readers never block in WAL mode. Writers serialize on SQLite's lock, so
//! the busy timeout is what decides between "wait a moment" and "retry".

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations::run_migrations;
use crate::repository::{
    CashierSessionRepository, CustomerRepository, DiscountRuleRepository, DraftCartRepository,
    ExpenseRepository, OutletRepository, ProductRepository, TransactionRepository,
};

const IN_MEMORY: &str = ":memory:";

/// Where the database lives and how hard the pool tries to reach it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Default 5: a handful of tills plus the back office.
    pub max_connections: u32,
    /// How long a writer waits for the SQLite lock. Default 5 s.
    pub busy_timeout: Duration,
    /// How long a command waits for a free pooled connection. Default 10 s.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// A file database at `path`, created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
        }
    }

    /// A private in-memory database, one connection wide. Used by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
        };

        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

/// Handle to the Kedai database. Clones share the pool.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("kedai.db")).await?;
/// let rules = db.discount_rules().list_active().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        // the in-memory database lives only as long as its one connection
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn outlets(&self) -> OutletRepository {
        OutletRepository::new(self.pool.clone())
    }

    pub fn discount_rules(&self) -> DiscountRuleRepository {
        DiscountRuleRepository::new(self.pool.clone())
    }

    /// Numbering and the checkout commit.
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    pub fn sessions(&self) -> CashierSessionRepository {
        CashierSessionRepository::new(self.pool.clone())
    }

    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn drafts(&self) -> DraftCartRepository {
        DraftCartRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_builder() {
        let config = DbConfig::new("/tmp/kedai.db")
            .max_connections(8)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);
    }

    #[tokio::test]
    async fn test_in_memory_database_has_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table'",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();

        for table in ["cashier_sessions", "discount_rules", "draft_carts", "transactions"] {
            assert!(tables.iter().any(|t| t == table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_reopening_file_database_keeps_data() {
        let path = std::env::temp_dir().join(format!("kedai-pool-{}.db", uuid::Uuid::new_v4()));

        let db = Database::new(DbConfig::new(path.clone())).await.unwrap();
        db.outlets()
            .insert(&crate::test_support::outlet())
            .await
            .unwrap();
        db.close().await;

        // migrations already applied; the second open must not fail or wipe data
        let db = Database::new(DbConfig::new(path.clone())).await.unwrap();
        assert!(db.outlets().get_by_id("outlet-1").await.unwrap().is_some());
        db.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
