//! Direct Message Data Structures
//!
//! Represents a direct message between two users, both in its persisted form
//! (`Message`, identified by the store) and in its locally synthesized form
//! (`PendingMessage`, shown before the store has acknowledged it).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::contact::UserId;

/// Store-assigned message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A persisted direct message. Immutable once the store has assigned its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message ID, assigned by the message store
    pub id: MessageId,
    /// User who sent the message
    pub sender_id: UserId,
    /// User the message was sent to
    pub receiver_id: UserId,
    /// Non-empty text content
    pub content: String,
    /// When the store recorded the message
    pub sent_at: DateTime<Utc>,
    /// Whether the receiver has read the message
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    /// Whether this message was exchanged between `a` and `b`, in either direction
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// A message shown locally before the store has acknowledged it
///
/// It has no store id. `temp_id` identifies it locally and `seq` orders
/// pending entries that share a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingMessage {
    pub temp_id: Uuid,
    pub seq: u64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl PendingMessage {
    /// Whether `message` carries the same sender, receiver and content
    pub fn matches(&self, message: &Message) -> bool {
        self.sender_id == message.sender_id
            && self.receiver_id == message.receiver_id
            && self.content == message.content
    }

    /// Absolute distance between the local and the store timestamp
    pub fn distance_to(&self, message: &Message) -> chrono::Duration {
        (message.sent_at - self.sent_at).abs()
    }
}

/// Secondary ordering key. Confirmed entries sort by id; pending entries
/// have no id yet and sort after confirmed entries with the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tiebreak {
    Confirmed(MessageId),
    Pending(u64),
}

/// An entry of the displayed conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayedMessage {
    /// Acknowledged by the message store
    Confirmed(Message),
    /// Optimistically inserted, not yet acknowledged
    Pending(PendingMessage),
}

impl DisplayedMessage {
    /// Ordering key: `(sent_at, id)` ascending
    pub fn sort_key(&self) -> (DateTime<Utc>, Tiebreak) {
        match self {
            DisplayedMessage::Confirmed(m) => (m.sent_at, Tiebreak::Confirmed(m.id)),
            DisplayedMessage::Pending(p) => (p.sent_at, Tiebreak::Pending(p.seq)),
        }
    }

    /// Store id, absent for pending entries
    pub fn id(&self) -> Option<MessageId> {
        match self {
            DisplayedMessage::Confirmed(m) => Some(m.id),
            DisplayedMessage::Pending(_) => None,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            DisplayedMessage::Confirmed(m) => &m.content,
            DisplayedMessage::Pending(p) => &p.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DisplayedMessage::Pending(_))
    }
}
