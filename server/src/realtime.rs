//! Realtime message fan-out.
//!
//! Every stored message is published on one broadcast channel; WebSocket
//! subscribers filter down to a single listing's conversation. Delivery is
//! best-effort: a lagged subscriber just misses entries, and the thread
//! view recomputes from a full fetch, so a dropped push never corrupts the
//! derived state.

use tokio::sync::broadcast;

use rummage_common::identity::UserId;
use rummage_common::listing::ListingId;
use rummage_common::message::Message;

const FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct MessageFeed {
    tx: broadcast::Sender<Message>,
}

impl Default for MessageFeed {
    fn default() -> Self {
        MessageFeed::new()
    }
}

impl MessageFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        MessageFeed { tx }
    }

    /// Publish a newly inserted message. No subscribers is not an error.
    pub fn publish(&self, message: Message) {
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }
}

/// Whether a pushed message belongs on `viewer`'s feed for `listing_id`.
pub fn relevant(message: &Message, listing_id: &ListingId, viewer: &UserId) -> bool {
    message.listing_id == *listing_id
        && (message.sender == *viewer || message.receiver == *viewer)
}
