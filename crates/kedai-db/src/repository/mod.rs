//! # Repository Module
//!
//! Database repository implementations for Kedai POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Backoffice command                                                    │
//! │       │                                                                 │
//! │       │  db.transactions().commit_checkout(&tx, &plan)                 │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                 │
//! │  ├── next_sequence(&self, outlet_code, date)                           │
//! │  ├── commit_checkout(&self, tx, decrements)                            │
//! │  └── get_by_id / list_for_session / list_since                         │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Rows are read into private `*Row` records (sqlx::FromRow) and         │
//! │  converted into kedai-core types, so the core never sees SQL.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`OutletRepository`](outlet::OutletRepository) - Outlets and categories
//! - [`ProductRepository`](product::ProductRepository) - Catalog and stock
//! - [`DiscountRuleRepository`](discount_rule::DiscountRuleRepository) - Discount rules
//! - [`TransactionRepository`](transaction::TransactionRepository) - Numbering and checkout commit
//! - [`CashierSessionRepository`](session::CashierSessionRepository) - Shifts
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Drawer expenses
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and backfill
//! - [`DraftCartRepository`](draft::DraftCartRepository) - Parked carts

pub mod customer;
pub mod discount_rule;
pub mod draft;
pub mod expense;
pub mod outlet;
pub mod product;
pub mod session;
pub mod transaction;

pub use customer::{CustomerRepository, LinkOutcome};
pub use discount_rule::DiscountRuleRepository;
pub use draft::DraftCartRepository;
pub use expense::ExpenseRepository;
pub use outlet::OutletRepository;
pub use product::ProductRepository;
pub use session::CashierSessionRepository;
pub use transaction::TransactionRepository;
