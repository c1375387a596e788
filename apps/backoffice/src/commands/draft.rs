//! # Draft Cart Commands
//!
//! One parked cart per user. A draft expires `drafts.ttl_hours` after it
//! was first saved; updating it does not extend that.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kedai_core::cart::draft_expiry_cutoff;
use kedai_core::{Actor, DraftCart, OrderChannel};

use super::checkout::{build_cart, CheckoutItem};
use super::load_outlet;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInput {
    #[serde(default)]
    pub outlet_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    pub items: Vec<CheckoutItem>,
}

/// Parks the actor's cart, replacing any earlier draft.
pub async fn save_draft(state: &AppState, actor: &Actor, input: DraftInput) -> ApiResult<DraftCart> {
    let now = state.now();
    let outlet_id = actor.resolve_outlet(input.outlet_id.as_deref())?;
    let outlet = load_outlet(state, &outlet_id).await?;

    let channel = match input.channel.as_deref() {
        Some(slug) => slug.parse::<OrderChannel>()?,
        None => OrderChannel::InStore,
    };
    let cart = build_cart(state, &outlet, channel, &input.items).await?;

    let cutoff = draft_expiry_cutoff(now, state.config.draft_ttl());
    let draft = match state.db.drafts().load(&actor.user_id, cutoff).await? {
        Some(mut existing) if existing.outlet_id == outlet.id => {
            existing.update(cart, now);
            existing
        }
        _ => DraftCart::new(&actor.user_id, &outlet.id, cart, now),
    };

    state.db.drafts().save(&draft).await?;
    debug!(owner_id = %draft.owner_id, lines = draft.cart.line_count(), "Draft saved");
    Ok(draft)
}

/// The actor's draft, unless it has expired.
pub async fn load_draft(state: &AppState, actor: &Actor) -> ApiResult<Option<DraftCart>> {
    let cutoff = draft_expiry_cutoff(state.now(), state.config.draft_ttl());
    Ok(state.db.drafts().load(&actor.user_id, cutoff).await?)
}

/// Drops the actor's draft. Returns whether there was one.
pub async fn discard_draft(state: &AppState, actor: &Actor) -> ApiResult<bool> {
    Ok(state.db.drafts().discard(&actor.user_id).await?)
}

/// Deletes every expired draft.
pub async fn reap_expired_drafts(state: &AppState) -> ApiResult<u64> {
    let cutoff = draft_expiry_cutoff(state.now(), state.config.draft_ttl());
    let reaped = state.db.drafts().reap_expired(cutoff).await?;
    info!(reaped, "Draft reap finished");
    Ok(reaped)
}
