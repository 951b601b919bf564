//! # Conversation State
//!
//! Phase of the conversation synchronizer and the snapshot it publishes.
//!
//! ```text
//! Idle --select--> Loading --loaded--> Live --send--> Sending --settled--> Live
//!   ^                 |                  |
//!   +----failed-------+----deselect------+
//! ```

use serde::Serialize;

use super::metrics::PollMetrics;
use crate::shared::error::SyncError;
use crate::shared::messaging::{DisplayedMessage, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    /// No conversation selected
    #[default]
    Idle,
    /// Initial history fetch in flight
    Loading,
    /// Polling is active
    Live,
    /// Polling is active and at least one send awaits acknowledgement
    Sending,
}

impl ConversationPhase {
    /// Whether messages can be sent in this phase
    pub fn is_live(&self) -> bool {
        matches!(self, ConversationPhase::Live | ConversationPhase::Sending)
    }
}

/// Published snapshot of the selected conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationView {
    pub phase: ConversationPhase,
    pub peer: Option<UserId>,
    /// Displayed sequence, ordered by `(sent_at, id)`
    pub messages: Vec<DisplayedMessage>,
    /// Latest background poll failure, cleared by the next success
    #[serde(skip)]
    pub notice: Option<SyncError>,
    pub metrics: PollMetrics,
}

impl ConversationView {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }

    /// Whether two views would render differently; metrics are ignored
    pub fn same_display(&self, other: &ConversationView) -> bool {
        self.phase == other.phase
            && self.peer == other.peer
            && self.messages == other.messages
            && self.notice == other.notice
    }
}
