use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::UserId;
use crate::listing::ListingId;

/// Unique identifier for a message (random u64, same pattern as listing and
/// order ids but numeric so ties sort deterministically).
pub type MessageId = u64;

/// Message payload: exactly one of text content or an image reference.
///
/// The storage layer exposes two nullable columns; this sum type is the
/// narrowed in-core shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageBody {
    Text(String),
    Image(String),
}

/// Raw row shape as read from (or written to) the storage collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageDraft {
    pub content: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageShapeError {
    #[error("message must carry either text content or an image")]
    Empty,
    #[error("message must not carry both text content and an image")]
    Both,
}

impl MessageDraft {
    /// Narrow the nullable pair into the content-xor-image invariant.
    pub fn into_body(self) -> Result<MessageBody, MessageShapeError> {
        match (self.content, self.image_url) {
            (Some(text), None) if !text.trim().is_empty() => Ok(MessageBody::Text(text)),
            (Some(_), None) | (None, None) => Err(MessageShapeError::Empty),
            (None, Some(url)) => Ok(MessageBody::Image(url)),
            (Some(_), Some(_)) => Err(MessageShapeError::Both),
        }
    }
}

/// A message within one listing's conversation.
///
/// Messages are immutable once created; only `is_read` flips, on the
/// receiver's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub listing_id: ListingId,
    pub sender: UserId,
    pub receiver: UserId,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// The other party of this message, from `viewer`'s perspective.
    pub fn counterparty(&self, viewer: &UserId) -> &UserId {
        if self.sender == *viewer {
            &self.receiver
        } else {
            &self.sender
        }
    }

    /// True when `viewer` received this message and has not read it.
    pub fn unread_by(&self, viewer: &UserId) -> bool {
        !self.is_read && self.receiver == *viewer
    }
}
