//! # Conversation Timeline
//!
//! Server-confirmed messages of one conversation and the merge that turns
//! them, plus the optimistic ledger, into the displayed sequence.
//!
//! ## Merge rules
//!
//! - Messages outside the conversation pair are ignored
//! - Confirmed messages are keyed by id; a snapshot copy replaces the held copy
//! - Duplicate ids within a snapshot collapse to one entry
//! - Pending sends stay displayed until a persisted copy claims them
//! - The result is ordered by `(sent_at, id)` ascending, pending entries
//!   after confirmed ones at the same instant
//!
//! Merging the same snapshot twice yields the same sequence.

use std::collections::{BTreeMap, HashSet};

use super::optimistic::OptimisticLedger;
use crate::shared::messaging::{
    ConversationKey, DisplayedMessage, Message, MessageId, PendingMessage,
};

/// Confirmed messages of one conversation, keyed by id
#[derive(Debug, Clone)]
pub struct Timeline {
    key: ConversationKey,
    confirmed: BTreeMap<MessageId, Message>,
}

impl Timeline {
    pub fn new(key: ConversationKey) -> Self {
        Self {
            key,
            confirmed: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> ConversationKey {
        self.key
    }

    /// Fold a store snapshot into the timeline
    ///
    /// Returns the number of messages that were new or replaced a differing copy.
    pub fn absorb<I>(&mut self, snapshot: I) -> usize
    where
        I: IntoIterator<Item = Message>,
    {
        let mut changed = 0;
        for message in snapshot {
            if self.upsert(message) {
                changed += 1;
            }
        }
        changed
    }

    /// Insert or replace one message. Returns false if an identical copy was held.
    pub fn upsert(&mut self, message: Message) -> bool {
        if !self.key.contains(&message) {
            return false;
        }
        match self.confirmed.get(&message.id) {
            Some(existing) if *existing == message => false,
            _ => {
                self.confirmed.insert(message.id, message);
                true
            }
        }
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.confirmed.get(&id)
    }

    /// Confirmed messages in id order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.confirmed.values()
    }

    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    /// Ids of held messages a pending send could be mistaken for
    pub fn ids_matching(&self, pending: &PendingMessage) -> HashSet<MessageId> {
        self.confirmed
            .values()
            .filter(|m| pending.matches(m))
            .map(|m| m.id)
            .collect()
    }

    /// Displayed sequence: confirmed messages and pending sends, ordered
    pub fn render(&self, ledger: &OptimisticLedger) -> Vec<DisplayedMessage> {
        let mut displayed: Vec<DisplayedMessage> = self
            .confirmed
            .values()
            .cloned()
            .map(DisplayedMessage::Confirmed)
            .chain(ledger.pending().cloned().map(DisplayedMessage::Pending))
            .collect();
        displayed.sort_by_key(DisplayedMessage::sort_key);
        displayed
    }
}

/// Merge a store snapshot into the conversation and return the new display
pub fn merge_snapshot<I>(
    timeline: &mut Timeline,
    ledger: &mut OptimisticLedger,
    snapshot: I,
) -> Vec<DisplayedMessage>
where
    I: IntoIterator<Item = Message>,
{
    timeline.absorb(snapshot);
    ledger.reconcile(timeline);
    timeline.render(ledger)
}
