//! Conversation Key
//!
//! A conversation is not persisted. It is the unordered pair of its two
//! participants, and its content is derived from the messages exchanged
//! between them.

use serde::{Deserialize, Serialize};

use super::contact::UserId;
use super::message::Message;

/// Unordered pair of participants, normalised so that `{a, b} == {b, a}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    low: UserId,
    high: UserId,
}

impl ConversationKey {
    /// Create the key for the conversation between two users
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Check if user is a participant
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// Get the other participant
    pub fn other_participant(&self, current_user_id: UserId) -> Option<UserId> {
        if current_user_id == self.low {
            Some(self.high)
        } else if current_user_id == self.high {
            Some(self.low)
        } else {
            None
        }
    }

    /// Whether `message` belongs to this conversation
    pub fn contains(&self, message: &Message) -> bool {
        message.is_between(self.low, self.high)
    }
}
