//! # Kedai POS Backoffice
//!
//! Application layer over `kedai-core` and `kedai-db`: one async function
//! per user action, each taking the shared [`AppState`] and the [`Actor`]
//! making the request.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. init_tracing() ────────────────────────────────────────────────────►│
//! │     • tracing-subscriber with env filter                                │
//! │     • Default: info,kedai=debug,sqlx=warn; override with RUST_LOG       │
//! │                                                                         │
//! │  2. AppConfig::load(path) ─────────────────────────────────────────────►│
//! │     • defaults < kedai.toml < KEDAI_* environment                       │
//! │                                                                         │
//! │  3. AppState::open(config) ────────────────────────────────────────────►│
//! │     • SQLite with WAL mode, pending migrations applied                  │
//! │     • PriceBook built from [pricing]                                    │
//! │                                                                         │
//! │  4. commands::* ───────────────────────────────────────────────────────►│
//! │     • checkout, open/close session, link_customer, drafts, ...          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Actor`]: kedai_core::Actor

pub mod commands;
pub mod config;
pub mod error;

#[cfg(test)]
pub(crate) mod test_support;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kedai_core::PriceBook;
use kedai_db::{Database, DbConfig};

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};

/// Source of the current time for commands.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared state handed to every command.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    prices: PriceBook,
    clock: Clock,
}

impl AppState {
    /// Connects to the configured database and runs migrations.
    pub async fn open(config: AppConfig) -> ApiResult<Self> {
        let path = config.database_path().ok_or_else(|| {
            ApiError::new(ErrorCode::Internal, "Could not determine app data directory")
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!(?path, "Failed to create data directory: {}", e);
                ApiError::new(ErrorCode::Internal, "Could not create data directory")
            })?;
        }
        info!(?path, "Database path determined");

        let db = Database::new(
            DbConfig::new(path).max_connections(config.database.max_connections),
        )
        .await?;

        info!(store = %config.store.name, "Database connected and migrations applied");
        Ok(Self::with_database(db, config))
    }

    /// State over an already-open database.
    pub fn with_database(db: Database, config: AppConfig) -> Self {
        let prices = config.price_book();
        AppState {
            db,
            config,
            prices,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn prices(&self) -> &PriceBook {
        &self.prices
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("config", &self.config)
            .field("prices", &self.prices)
            .finish_non_exhaustive()
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kedai=trace` - Show trace for kedai crates only
/// - Default: `info,kedai=debug,sqlx=warn`
///
/// Calling it again is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kedai=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
