//! # Backoffice Commands
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── catalog.rs   ◄─── Priced menu, stock adjustments
//! ├── checkout.rs  ◄─── Preview and commit a sale
//! ├── session.rs   ◄─── Open/close the cash drawer, shift summary
//! ├── customer.rs  ◄─── Customer backfill, member lookup
//! ├── discount.rs  ◄─── Discount rule management (owner only)
//! ├── expense.rs   ◄─── Cash paid out of the drawer
//! └── draft.rs     ◄─── Parked carts
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  async fn checkout(                                                     │
//! │      state: &AppState,       ◄── database, config, price book, clock    │
//! │      actor: &Actor,          ◄── who is asking (role + home outlet)     │
//! │      input: CheckoutInput,   ◄── deserialized from the frontend         │
//! │  ) -> ApiResult<Transaction>                                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Capabilities decided once from the actor, business rules delegated     │
//! │  to kedai-core, persistence to kedai-db.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod checkout;
pub mod customer;
pub mod discount;
pub mod draft;
pub mod expense;
pub mod session;

pub use catalog::{list_menu, restock, set_product_active, write_off_stock, MenuEntry};
pub use checkout::{checkout, preview_checkout, CheckoutInput, CheckoutItem, CheckoutPreview};
pub use customer::{link_customer, validate_member};
pub use discount::{
    create_discount_rule, deactivate_discount_rule, delete_discount_rule, list_discount_rules,
    update_discount_rule, DiscountRuleInput,
};
pub use draft::{discard_draft, load_draft, reap_expired_drafts, save_draft, DraftInput};
pub use expense::record_expense;
pub use session::{close_session, list_sessions, open_session, session_summary, ShiftSummary};

use kedai_core::{CoreError, Outlet};

use crate::error::ApiResult;
use crate::AppState;

pub(crate) async fn load_outlet(state: &AppState, outlet_id: &str) -> ApiResult<Outlet> {
    Ok(state
        .db
        .outlets()
        .get_by_id(outlet_id)
        .await?
        .ok_or_else(|| CoreError::OutletNotFound(outlet_id.to_string()))?)
}
