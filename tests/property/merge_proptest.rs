//! Property-based tests for the conversation merge

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;

use cinesync::shared::messaging::{ConversationKey, Message, MessageId, UserId};
use cinesync::sync::{merge_snapshot, OptimisticLedger, Timeline};

const CONTENTS: [&str; 3] = ["hi", "hey", "ok"];

#[derive(Debug, Clone)]
struct RawMessage {
    id: i64,
    outgoing: bool,
    content: usize,
    secs: i64,
}

fn raw_message() -> impl Strategy<Value = RawMessage> {
    (1i64..40, any::<bool>(), 0usize..CONTENTS.len(), 0i64..100).prop_map(
        |(id, outgoing, content, secs)| RawMessage {
            id,
            outgoing,
            content,
            secs,
        },
    )
}

fn to_message(raw: &RawMessage, me: UserId, peer: UserId) -> Message {
    let (sender_id, receiver_id) = if raw.outgoing { (me, peer) } else { (peer, me) };
    Message {
        id: MessageId(raw.id),
        sender_id,
        receiver_id,
        content: CONTENTS[raw.content].to_string(),
        sent_at: Utc.timestamp_opt(raw.secs, 0).unwrap(),
        is_read: false,
    }
}

proptest! {
    #[test]
    fn test_merge_twice_equals_merge_once(
        history in prop::collection::vec(raw_message(), 0..20),
        snapshot in prop::collection::vec(raw_message(), 0..20),
        pending in prop::collection::vec((0usize..CONTENTS.len(), 0i64..120), 0..4),
    ) {
        let (me, peer) = (UserId::new(), UserId::new());
        let mut timeline = Timeline::new(ConversationKey::new(me, peer));
        let mut ledger = OptimisticLedger::new();
        timeline.absorb(history.iter().map(|m| to_message(m, me, peer)));
        for (content, secs) in &pending {
            ledger.insert(
                me,
                peer,
                CONTENTS[*content].to_string(),
                Utc.timestamp_opt(*secs, 0).unwrap(),
                &timeline,
            );
        }

        let snapshot: Vec<Message> = snapshot.iter().map(|m| to_message(m, me, peer)).collect();
        let once = merge_snapshot(&mut timeline, &mut ledger, snapshot.clone());
        let twice = merge_snapshot(&mut timeline, &mut ledger, snapshot);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_merged_sequence_is_ordered_without_duplicate_ids(
        snapshot in prop::collection::vec(raw_message(), 0..30),
        pending in prop::collection::vec((0usize..CONTENTS.len(), 0i64..120), 0..4),
    ) {
        let (me, peer) = (UserId::new(), UserId::new());
        let mut timeline = Timeline::new(ConversationKey::new(me, peer));
        let mut ledger = OptimisticLedger::new();
        for (content, secs) in &pending {
            ledger.insert(
                me,
                peer,
                CONTENTS[*content].to_string(),
                Utc.timestamp_opt(*secs, 0).unwrap(),
                &timeline,
            );
        }

        let snapshot: Vec<Message> = snapshot.iter().map(|m| to_message(m, me, peer)).collect();
        let distinct: HashSet<MessageId> = snapshot.iter().map(|m| m.id).collect();
        let displayed = merge_snapshot(&mut timeline, &mut ledger, snapshot);

        let keys: Vec<_> = displayed.iter().map(|d| d.sort_key()).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        let ids: Vec<MessageId> = displayed.iter().filter_map(|d| d.id()).collect();
        let unique: HashSet<MessageId> = ids.iter().copied().collect();
        prop_assert_eq!(ids.len(), unique.len());
        prop_assert_eq!(&unique, &distinct);

        // Each absorbed pending entry consumed a distinct confirmed message
        prop_assert!(displayed.len() <= distinct.len() + pending.len());
        prop_assert_eq!(displayed.iter().filter(|d| d.is_pending()).count(), ledger.len());
    }
}
