//! Property-based tests for the follow graph

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

use cinesync::graph::FollowGraph;
use cinesync::shared::messaging::UserId;
use cinesync::shared::SyncError;
use cinesync::stores::memory::InMemoryFollowGraphStore;

#[derive(Debug, Clone)]
enum Op {
    Follow(usize, usize),
    Unfollow(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4, 0usize..4).prop_map(|(a, b)| Op::Follow(a, b)),
        (0usize..4, 0usize..4).prop_map(|(a, b)| Op::Unfollow(a, b)),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_graph_matches_edge_set_model(ops in prop::collection::vec(op(), 0..40)) {
        let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        let graph = FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new()));
        let mut model: BTreeSet<(UserId, UserId)> = BTreeSet::new();

        runtime().block_on(async {
            for op in &ops {
                match *op {
                    Op::Follow(a, b) if a == b => {
                        let result = graph.follow(users[a], users[b]).await;
                        assert!(matches!(result, Err(SyncError::InvalidOperation { .. })));
                    }
                    Op::Follow(a, b) => {
                        graph.follow(users[a], users[b]).await.unwrap();
                        model.insert((users[a], users[b]));
                    }
                    Op::Unfollow(a, b) => {
                        graph.unfollow(users[a], users[b]).await.unwrap();
                        model.remove(&(users[a], users[b]));
                    }
                }
            }
        });

        let snapshot = runtime().block_on(graph.snapshot());
        prop_assert!(snapshot.is_consistent());
        let edges: BTreeSet<(UserId, UserId)> = snapshot.edges().into_iter().collect();
        prop_assert_eq!(&edges, &model);

        for user in &users {
            let following: BTreeSet<UserId> = model
                .iter()
                .filter(|(follower, _)| follower == user)
                .map(|(_, followed)| *followed)
                .collect();
            let followers: BTreeSet<UserId> = model
                .iter()
                .filter(|(_, followed)| followed == user)
                .map(|(follower, _)| *follower)
                .collect();
            prop_assert_eq!(snapshot.following(*user), following);
            prop_assert_eq!(snapshot.followers(*user), followers);
        }
    }

    #[test]
    fn test_follow_twice_is_idempotent(a in 0usize..3, b in 0usize..3) {
        prop_assume!(a != b);
        let users: Vec<UserId> = (0..3).map(|_| UserId::new()).collect();
        let graph = FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new()));

        let (once, twice) = runtime().block_on(async {
            graph.follow(users[a], users[b]).await.unwrap();
            let once = graph.snapshot().await.edges();
            graph.follow(users[a], users[b]).await.unwrap();
            (once, graph.snapshot().await.edges())
        });
        prop_assert_eq!(once, twice);
    }
}
