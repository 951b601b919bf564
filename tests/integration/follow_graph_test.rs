//! Follow graph scenarios

use std::sync::Arc;

use cinesync::graph::FollowGraph;
use cinesync::shared::messaging::{User, UserId};
use cinesync::shared::SyncError;
use cinesync::stores::memory::{InMemoryFollowGraphStore, InMemoryUserDirectory};
use cinesync::stores::EdgeChange;

use crate::common::World;

#[tokio::test]
async fn test_follow_is_visible_from_both_sides() {
    let world = World::new();
    let friend = UserId::new();

    assert_ok!(world.graph.follow(world.me, friend).await);

    assert!(world.graph.is_following(world.me, friend).await);
    assert!(world.graph.following(world.me).await.contains(&friend));
    assert!(world.graph.followers(friend).await.contains(&world.me));
    assert!(world.edges.contains_edge(world.me, friend).await);
}

#[tokio::test]
async fn test_repeated_follow_leaves_edges_unchanged() {
    let world = World::new();
    let friend = UserId::new();

    assert_ok!(world.graph.follow(world.me, friend).await);
    let before = world.graph.snapshot().await.edges();
    let change = assert_ok!(world.graph.follow(world.me, friend).await);

    assert_eq!(change, EdgeChange::Unchanged);
    assert_eq!(world.graph.snapshot().await.edges(), before);
}

#[tokio::test]
async fn test_self_follow_is_invalid() {
    let world = World::new();
    assert_err!(
        world.graph.follow(world.me, world.me).await,
        SyncError::InvalidOperation { .. }
    );
    assert!(world.graph.following(world.me).await.is_empty());
}

#[tokio::test]
async fn test_unfollow_removes_both_projections() {
    let world = World::new();
    let friend = UserId::new();
    assert_ok!(world.graph.follow(world.me, friend).await);

    assert_eq!(
        assert_ok!(world.graph.unfollow(world.me, friend).await),
        EdgeChange::Applied
    );
    assert!(!world.graph.is_following(world.me, friend).await);
    assert!(world.graph.followers(friend).await.is_empty());
    assert_eq!(
        assert_ok!(world.graph.unfollow(world.me, friend).await),
        EdgeChange::Unchanged
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mutations_on_one_pair_settle_consistently() {
    let store = Arc::new(InMemoryFollowGraphStore::new());
    let graph = Arc::new(FollowGraph::new(store.clone()));
    let (a, b) = (UserId::new(), UserId::new());

    let mut handles = Vec::new();
    for i in 0..64 {
        let graph = graph.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                graph.follow(a, b).await
            } else {
                graph.unfollow(a, b).await
            }
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let snapshot = graph.snapshot().await;
    assert!(snapshot.is_consistent());
    let following = graph.is_following(a, b).await;
    assert_eq!(following, graph.followers(b).await.contains(&a));
    assert_eq!(following, store.contains_edge(a, b).await);
}

#[tokio::test]
async fn test_readers_never_see_half_an_edge() {
    let graph = Arc::new(FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new())));
    let (a, b) = (UserId::new(), UserId::new());

    let writer = {
        let graph = graph.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                graph.follow(a, b).await.unwrap();
                graph.unfollow(a, b).await.unwrap();
            }
        })
    };
    for _ in 0..50 {
        assert!(graph.snapshot().await.is_consistent());
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}

#[tokio::test]
async fn test_hydrated_graph_matches_directory() {
    let directory = InMemoryUserDirectory::new();
    let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());

    let mut ana = User::new(a, "ana");
    ana.following_ids.extend([b, c]);
    let mut ben = User::new(b, "ben");
    ben.follower_ids.insert(a);
    ben.following_ids.insert(c);
    directory.insert(ana).await;
    directory.insert(ben).await;
    directory.insert(User::new(c, "cy")).await;

    let graph = FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new()));
    assert_eq!(assert_ok!(graph.hydrate_from_directory(&directory).await), 3);
    assert_eq!(graph.followers(c).await.len(), 2);

    directory.set_unavailable(true);
    assert_err!(
        graph.hydrate_from_directory(&directory).await,
        SyncError::FetchFailed { .. }
    );
    assert_eq!(graph.snapshot().await.edge_count(), 3);
}
