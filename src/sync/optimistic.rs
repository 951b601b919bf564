//! # Optimistic Ledger
//!
//! Tracks messages shown before the message store acknowledged them.
//!
//! ## Lifecycle
//!
//! - `insert` - a send starts; the entry is displayed immediately
//! - `confirm` - the store acknowledged the send; the entry is dropped and
//!   the returned id is bound so no other entry can claim it
//! - `rollback` - the store refused the send; the entry is dropped
//! - `reconcile` - a poll returned the persisted copy before the
//!   acknowledgement did; the entry is absorbed into that copy
//!
//! An entry has no store id, so reconciliation matches on sender, receiver
//! and content, picking the candidate with the closest timestamp. Ids that
//! were already displayed when the entry was created never match it.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::timeline::Timeline;
use crate::shared::messaging::{Message, MessageId, PendingMessage, UserId};

#[derive(Debug, Clone)]
struct LedgerEntry {
    message: PendingMessage,
    /// Same-content ids already displayed when the entry was created
    preexisting: HashSet<MessageId>,
}

/// Pending optimistic sends for one conversation
#[derive(Debug, Default, Clone)]
pub struct OptimisticLedger {
    next_seq: u64,
    /// Keyed by `seq`, so iteration follows send order
    entries: BTreeMap<u64, LedgerEntry>,
    /// Ids already paired with a send
    bound: HashSet<MessageId>,
}

impl OptimisticLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a send that has not been acknowledged yet
    pub fn insert(
        &mut self,
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
        sent_at: DateTime<Utc>,
        timeline: &Timeline,
    ) -> PendingMessage {
        let seq = self.next_seq;
        self.next_seq += 1;

        let message = PendingMessage {
            temp_id: Uuid::new_v4(),
            seq,
            sender_id,
            receiver_id,
            content,
            sent_at,
        };
        let preexisting = timeline.ids_matching(&message);
        self.entries.insert(
            seq,
            LedgerEntry {
                message: message.clone(),
                preexisting,
            },
        );
        message
    }

    /// Drop the entry for an acknowledged send and bind the stored id
    ///
    /// Returns false when a poll had already absorbed the entry.
    pub fn confirm(&mut self, temp_id: Uuid, stored: &Message) -> bool {
        self.bound.insert(stored.id);
        self.remove(temp_id).is_some()
    }

    /// Drop the entry for a failed send
    pub fn rollback(&mut self, temp_id: Uuid) -> Option<PendingMessage> {
        self.remove(temp_id)
    }

    /// Absorb every entry whose persisted copy is already in `timeline`
    ///
    /// Entries are visited in send order. Each one takes the closest
    /// unclaimed match by timestamp, ties going to the lower id. Returns the
    /// `(temp_id, id)` pairs that were absorbed.
    pub fn reconcile(&mut self, timeline: &Timeline) -> Vec<(Uuid, MessageId)> {
        let mut absorbed = Vec::new();

        let seqs: Vec<u64> = self.entries.keys().copied().collect();
        for seq in seqs {
            let Some(entry) = self.entries.get(&seq) else {
                continue;
            };
            let candidate = timeline
                .messages()
                .filter(|m| entry.message.matches(m))
                .filter(|m| !entry.preexisting.contains(&m.id) && !self.bound.contains(&m.id))
                .min_by_key(|m| (entry.message.distance_to(m), m.id));

            if let Some(found) = candidate {
                let id = found.id;
                let temp_id = entry.message.temp_id;
                self.bound.insert(id);
                self.entries.remove(&seq);
                absorbed.push((temp_id, id));
            }
        }
        absorbed
    }

    /// Pending entries in send order
    pub fn pending(&self) -> impl Iterator<Item = &PendingMessage> {
        self.entries.values().map(|entry| &entry.message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, temp_id: Uuid) -> Option<PendingMessage> {
        let seq = self
            .entries
            .iter()
            .find(|(_, entry)| entry.message.temp_id == temp_id)
            .map(|(seq, _)| *seq)?;
        self.entries.remove(&seq).map(|entry| entry.message)
    }
}
