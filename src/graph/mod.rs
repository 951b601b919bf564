//! # Follow Graph
//!
//! The directed follow relation between users. It decides who may be
//! messaged and whose recommendations appear in a feed.
//!
//! ## Consistency
//!
//! Mutations go to the [`FollowGraphStore`] first and are applied to the
//! in-memory [`EdgeIndex`] only once the store accepted them. Both
//! projections are updated under one write lock, and mutations are
//! serialized, so concurrent follow/unfollow calls on the same pair settle
//! on whichever call ran last.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cinesync::graph::FollowGraph;
//! use cinesync::stores::memory::InMemoryFollowGraphStore;
//! use cinesync::shared::messaging::UserId;
//!
//! # async fn example() -> cinesync::shared::SyncResult<()> {
//! let graph = FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new()));
//! let (alice, bob) = (UserId::new(), UserId::new());
//! graph.follow(alice, bob).await?;
//! assert!(graph.is_following(alice, bob).await);
//! # Ok(())
//! # }
//! ```

mod edge_index;

pub use edge_index::EdgeIndex;

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::shared::error::{SyncError, SyncResult};
use crate::shared::messaging::UserId;
use crate::stores::{EdgeChange, FollowGraphStore, UserDirectory};

/// Follow graph backed by a durable edge store
pub struct FollowGraph {
    store: Arc<dyn FollowGraphStore>,
    index: RwLock<EdgeIndex>,
    /// Held across the store call so the index applies mutations in store order
    mutation_gate: Mutex<()>,
}

impl std::fmt::Debug for FollowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowGraph").finish_non_exhaustive()
    }
}

impl FollowGraph {
    /// Create an empty graph over `store`
    pub fn new(store: Arc<dyn FollowGraphStore>) -> Self {
        Self {
            store,
            index: RwLock::new(EdgeIndex::new()),
            mutation_gate: Mutex::new(()),
        }
    }

    /// Add `follower -> followed`
    ///
    /// Following someone already followed succeeds with
    /// [`EdgeChange::Unchanged`]. Following oneself fails with
    /// `InvalidOperation`.
    pub async fn follow(&self, follower: UserId, followed: UserId) -> SyncResult<EdgeChange> {
        if follower == followed {
            return Err(SyncError::invalid_operation(format!(
                "user {} cannot follow themselves",
                follower
            )));
        }

        let _guard = self.mutation_gate.lock().await;
        let change = self.store.add_edge(follower, followed).await.map_err(|e| {
            warn!("[GRAPH] follow {} -> {} failed: {}", follower, followed, e);
            SyncError::graph_update_failed(e.to_string())
        })?;

        let inserted = self.index.write().await.insert(follower, followed);
        if inserted {
            info!("[GRAPH] {} now follows {}", follower, followed);
        } else {
            debug!("[GRAPH] {} already follows {}", follower, followed);
        }
        Ok(merge_change(change, inserted))
    }

    /// Remove `follower -> followed`; absent edges are a no-op success
    pub async fn unfollow(&self, follower: UserId, followed: UserId) -> SyncResult<EdgeChange> {
        let _guard = self.mutation_gate.lock().await;
        let change = self.store.remove_edge(follower, followed).await.map_err(|e| {
            warn!("[GRAPH] unfollow {} -> {} failed: {}", follower, followed, e);
            SyncError::graph_update_failed(e.to_string())
        })?;

        let removed = self.index.write().await.remove(follower, followed);
        if removed {
            info!("[GRAPH] {} no longer follows {}", follower, followed);
        } else {
            debug!("[GRAPH] {} did not follow {}", follower, followed);
        }
        Ok(merge_change(change, removed))
    }

    pub async fn is_following(&self, follower: UserId, followed: UserId) -> bool {
        self.index.read().await.contains(follower, followed)
    }

    /// Users `user` follows
    pub async fn following(&self, user: UserId) -> BTreeSet<UserId> {
        self.index.read().await.following(user)
    }

    /// Users following `user`
    pub async fn followers(&self, user: UserId) -> BTreeSet<UserId> {
        self.index.read().await.followers(user)
    }

    /// Copy of the whole index, taken under one read lock
    pub async fn snapshot(&self) -> EdgeIndex {
        self.index.read().await.clone()
    }

    /// Replace the index with the edges recorded in the user directory
    ///
    /// Both `following_ids` and `follower_ids` contribute edges, so a
    /// directory that only fills one side still yields a consistent graph.
    /// Self-edges are dropped. Returns the number of edges loaded.
    ///
    /// Hydration only rewrites the in-memory index; nothing is written to
    /// the [`FollowGraphStore`], so the two can disagree until the store is
    /// loaded from the same source. Follow and unfollow calls wait for
    /// hydration to finish and then apply on top of the loaded edges.
    pub async fn hydrate_from_directory(&self, directory: &dyn UserDirectory) -> SyncResult<usize> {
        let _guard = self.mutation_gate.lock().await;
        let users = directory.list_users().await.map_err(SyncError::from_read)?;

        let mut index = EdgeIndex::new();
        for user in &users {
            for followed in &user.following_ids {
                index.insert(user.id, *followed);
            }
            for follower in &user.follower_ids {
                index.insert(*follower, user.id);
            }
        }
        let count = index.edge_count();
        *self.index.write().await = index;
        info!("[GRAPH] hydrated {} edges from {} users", count, users.len());
        Ok(count)
    }
}

fn merge_change(store: EdgeChange, local: bool) -> EdgeChange {
    if store == EdgeChange::Applied || local {
        EdgeChange::Applied
    } else {
        EdgeChange::Unchanged
    }
}
