//! In-process storage collaborator.
//!
//! Stands in for the managed platform that owns all durable state. The
//! contract mirrors what the platform offers: filter queries, inserts that
//! return the generated id, and per-row read-modify-write. Transitions
//! validate and mutate under the same map entry lock, so a refused
//! transition leaves no partial write behind.

use std::collections::BTreeSet;

use chrono::Utc;
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;

use rummage_common::identity::{CurrentUser, UserId};
use rummage_common::listing::{Listing, ListingDraft, ListingId, ListingQuery, ListingStatus};
use rummage_common::message::{Message, MessageBody, MessageId};
use rummage_common::order::{Order, OrderError, OrderId, OrderItem, OrderStatusFilter};
use rummage_common::review::{Review, ReviewId};
use rummage_common::favorite::Report;

use crate::error::ApiError;

fn gen_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{prefix}-{suffix}")
}

#[derive(Default)]
pub struct Store {
    listings: DashMap<ListingId, Listing>,
    orders: DashMap<OrderId, Order>,
    order_items: DashMap<OrderId, Vec<OrderItem>>,
    messages: DashMap<MessageId, Message>,
    reviews: DashMap<ReviewId, Review>,
    reports: DashMap<(UserId, ListingId), Report>,
    favorites: DashMap<UserId, BTreeSet<ListingId>>,
    sessions: DashMap<String, CurrentUser>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    // ── Sessions ────────────────────────────────────────────────────────

    /// Register a session and return its bearer token.
    pub fn open_session(&self, user: CurrentUser) -> String {
        let token = gen_id("tok");
        self.sessions.insert(token.clone(), user);
        token
    }

    pub fn session(&self, token: &str) -> Option<CurrentUser> {
        self.sessions.get(token).map(|u| u.clone())
    }

    // ── Listings ────────────────────────────────────────────────────────

    pub fn insert_listing(&self, draft: ListingDraft, owner: UserId) -> Listing {
        let listing = draft.into_listing(ListingId(gen_id("l")), owner, Utc::now());
        self.listings.insert(listing.id.clone(), listing.clone());
        listing
    }

    pub fn listing(&self, id: &ListingId) -> Option<Listing> {
        self.listings.get(id).map(|l| l.clone())
    }

    pub fn search_listings(&self, query: &ListingQuery) -> Vec<Listing> {
        query.apply(self.listings.iter().map(|e| e.value().clone()))
    }

    /// Owner-only soft delete: the row stays, marked inactive.
    pub fn deactivate_listing(&self, id: &ListingId, actor: &UserId) -> Result<(), ApiError> {
        let mut entry = self.listings.get_mut(id).ok_or(ApiError::NotFound)?;
        if entry.owner != *actor {
            return Err(ApiError::Forbidden);
        }
        entry.status = ListingStatus::Inactive;
        Ok(())
    }

    /// Owner-only price edit. Existing orders keep their snapshots.
    pub fn reprice_listing(
        &self,
        id: &ListingId,
        actor: &UserId,
        price_cents: u64,
    ) -> Result<Listing, ApiError> {
        if price_cents == 0 {
            return Err(ApiError::Validation("price must be greater than zero".into()));
        }
        let mut entry = self.listings.get_mut(id).ok_or(ApiError::NotFound)?;
        if entry.owner != *actor {
            return Err(ApiError::Forbidden);
        }
        entry.price_cents = price_cents;
        Ok(entry.clone())
    }

    // ── Orders ──────────────────────────────────────────────────────────

    /// Run the placement guards and persist order + snapshot line item.
    /// Listing status is untouched: only the owner mutates it, so a sale
    /// stays purchasable until the seller marks it sold or inactive.
    pub fn place_order(
        &self,
        listing_id: &ListingId,
        buyer: &CurrentUser,
    ) -> Result<Order, ApiError> {
        let listing = self.listing(listing_id).ok_or(ApiError::NotFound)?;
        let (order, item) = Order::place(OrderId(gen_id("o")), &listing, buyer, Utc::now())?;
        self.order_items.insert(order.id.clone(), vec![item]);
        self.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.orders.get(id).map(|o| o.clone())
    }

    pub fn order_items(&self, id: &OrderId) -> Vec<OrderItem> {
        self.order_items
            .get(id)
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    /// A buyer's own orders, optionally filtered, newest first.
    pub fn orders_for_buyer(&self, buyer: &UserId, filter: OrderStatusFilter) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|e| e.value().buyer == *buyer && filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }

    /// Apply a state transition under the order's entry lock.
    pub fn update_order<F>(&self, id: &OrderId, f: F) -> Result<Order, ApiError>
    where
        F: FnOnce(&mut Order) -> Result<(), OrderError>,
    {
        let mut entry = self.orders.get_mut(id).ok_or(ApiError::NotFound)?;
        f(entry.value_mut())?;
        Ok(entry.clone())
    }

    // ── Messages ────────────────────────────────────────────────────────

    pub fn insert_message(
        &self,
        listing_id: ListingId,
        sender: UserId,
        receiver: UserId,
        body: MessageBody,
    ) -> Message {
        let message = Message {
            id: rand::thread_rng().gen(),
            listing_id,
            sender,
            receiver,
            body,
            created_at: Utc::now(),
            is_read: false,
        };
        self.messages.insert(message.id, message.clone());
        message
    }

    /// The messages of one `(listing, viewer, counterparty)` thread.
    /// A conversation is keyed by listing AND counterparty: a seller with
    /// two interested buyers holds two separate threads on one listing.
    pub fn conversation_messages(
        &self,
        listing_id: &ListingId,
        viewer: &UserId,
        counterparty: &UserId,
    ) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|e| {
                let m = e.value();
                m.listing_id == *listing_id
                    && ((m.sender == *viewer && m.receiver == *counterparty)
                        || (m.sender == *counterparty && m.receiver == *viewer))
            })
            .map(|e| e.value().clone())
            .collect()
    }

    /// Every message involving `viewer`, across all listings.
    pub fn messages_for(&self, viewer: &UserId) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|e| e.value().sender == *viewer || e.value().receiver == *viewer)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Mark the viewer's received side of one thread read, scoped to the
    /// counterparty so a seller's other threads keep their unread state.
    /// Returns how many messages flipped.
    pub fn mark_conversation_read(
        &self,
        listing_id: &ListingId,
        viewer: &UserId,
        counterparty: &UserId,
    ) -> usize {
        let mut flipped = 0;
        for mut entry in self.messages.iter_mut() {
            let m = entry.value_mut();
            if m.listing_id == *listing_id
                && m.receiver == *viewer
                && m.sender == *counterparty
                && !m.is_read
            {
                m.is_read = true;
                flipped += 1;
            }
        }
        flipped
    }

    // ── Favorites / reports ─────────────────────────────────────────────

    /// Idempotent favorite toggle; returns the state after the call.
    pub fn toggle_favorite(&self, user: &UserId, listing_id: &ListingId) -> bool {
        let mut set = self.favorites.entry(user.clone()).or_default();
        rummage_common::favorite::toggle(&mut set, listing_id)
    }

    pub fn favorites_of(&self, user: &UserId) -> Vec<Listing> {
        let Some(set) = self.favorites.get(user) else {
            return Vec::new();
        };
        set.iter().filter_map(|id| self.listing(id)).collect()
    }

    /// Keyed by (reporter, listing): a re-submit overwrites, never duplicates.
    pub fn upsert_report(&self, report: Report) {
        self.reports
            .insert((report.reporter.clone(), report.listing_id.clone()), report);
    }

    pub fn report_count(&self, listing_id: &ListingId) -> usize {
        self.reports
            .iter()
            .filter(|e| e.key().1 == *listing_id)
            .count()
    }

    // ── Reviews ─────────────────────────────────────────────────────────

    pub fn insert_review(&self, mut review: Review) -> Review {
        review.id = ReviewId(gen_id("r"));
        self.reviews.insert(review.id.clone(), review.clone());
        review
    }

    pub fn reviews_for_listing(&self, listing_id: &ListingId) -> Vec<Review> {
        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|e| e.value().listing_id == *listing_id)
            .map(|e| e.value().clone())
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews
    }
}
