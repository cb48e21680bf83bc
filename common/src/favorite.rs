//! Idempotent set-membership toggles: favorites and reports.
//!
//! Both are a presence-check-then-insert-or-remove against a
//! `(user, listing)` composite key. Set semantics carry the uniqueness
//! guarantee: re-inserting an existing pair is a no-op, so a double-click
//! can never produce two rows.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::listing::ListingId;

/// Flip membership of `listing` in a user's favorite set.
/// Returns `true` when the listing is a favorite after the call.
pub fn toggle(favorites: &mut BTreeSet<ListingId>, listing: &ListingId) -> bool {
    if favorites.remove(listing) {
        false
    } else {
        favorites.insert(listing.clone());
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Prohibited,
    Counterfeit,
    Spam,
    Fraud,
    Other,
}

/// A user's report against a listing. One per `(reporter, listing)` pair;
/// the store keeps reports keyed by that pair so a re-submit overwrites
/// rather than duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub reporter: UserId,
    pub listing_id: ListingId,
    pub reason: ReportReason,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
