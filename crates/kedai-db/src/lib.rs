//! # kedai-db: Database Layer for Kedai POS
//!
//! This crate provides database access for Kedai POS.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kedai POS Data Flow                              │
//! │                                                                         │
//! │  Backoffice command (checkout)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kedai-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo    │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ TransactionRepo│   │ 001_init.sql │  │   │
//! │  │   │ WAL + busy    │    │ SessionRepo    │   │              │  │   │
//! │  │   │ timeout       │    │ CustomerRepo.. │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kedai.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kedai_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kedai.db")).await?;
//!
//! let rules = db.discount_rules().list_active().await?;
//! let seq = db.transactions().next_sequence("KKS", business_date).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{CustomerRepository, LinkOutcome};
pub use repository::discount_rule::DiscountRuleRepository;
pub use repository::draft::DraftCartRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::outlet::OutletRepository;
pub use repository::product::ProductRepository;
pub use repository::session::CashierSessionRepository;
pub use repository::transaction::TransactionRepository;

#[cfg(test)]
pub(crate) mod test_support;
