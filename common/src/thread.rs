//! Derived conversation views.
//!
//! Messages reach a client from two sources: an initial bulk fetch and a
//! realtime push feed, with no arrival-order or no-duplicate guarantee
//! between them. Everything here recomputes a full view from the full
//! accumulated message set on every change. That full recompute is the
//! point: incremental merging would reintroduce the ordering bugs this
//! design avoids, and a single user's conversations are small.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::listing::ListingId;
use crate::message::{Message, MessageId};

/// One inbox row: the latest state of a `(listing, counterparty)` thread.
/// A view, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub listing_id: ListingId,
    pub counterparty: UserId,
    pub last_message: Message,
    pub has_unread: bool,
}

impl ThreadSummary {
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message.created_at
    }
}

/// Collapse an unordered bag of messages into one deterministic
/// conversation: duplicates (by id) dropped, then sorted by
/// `(created_at, id)` ascending. First occurrence wins on duplicate ids;
/// messages are immutable so later copies carry nothing new.
pub fn conversation(messages: &[Message]) -> Vec<Message> {
    let mut by_id: BTreeMap<MessageId, &Message> = BTreeMap::new();
    for msg in messages {
        by_id.entry(msg.id).or_insert(msg);
    }
    let mut ordered: Vec<Message> = by_id.into_values().cloned().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    ordered
}

/// Collapse messages across many listings into per-thread summaries for
/// `viewer`. Each `(listing, counterparty)` key keeps its chronologically
/// last message; `has_unread` is the OR over the viewer's unread received
/// messages in that group. Sorted most-recent-first.
pub fn inbox(messages: &[Message], viewer: &UserId) -> Vec<ThreadSummary> {
    let ordered = conversation(messages);

    let mut threads: BTreeMap<(ListingId, UserId), ThreadSummary> = BTreeMap::new();
    for msg in ordered {
        if msg.sender != *viewer && msg.receiver != *viewer {
            continue;
        }
        let key = (msg.listing_id.clone(), msg.counterparty(viewer).clone());
        let unread = msg.unread_by(viewer);
        threads
            .entry(key.clone())
            .and_modify(|t| {
                // `ordered` is ascending, so this message is the latest so far.
                t.last_message = msg.clone();
                t.has_unread |= unread;
            })
            .or_insert(ThreadSummary {
                listing_id: key.0,
                counterparty: key.1,
                last_message: msg,
                has_unread: unread,
            });
    }

    let mut summaries: Vec<ThreadSummary> = threads.into_values().collect();
    summaries.sort_by(|a, b| {
        b.last_activity()
            .cmp(&a.last_activity())
            .then(b.last_message.id.cmp(&a.last_message.id))
    });
    summaries
}
