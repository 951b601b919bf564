//! # Edge Index
//!
//! In-memory projection of the follow edge set. The forward map answers
//! `following(u)` and the reverse map answers `followers(u)`; every mutation
//! touches both, so holders of one `&mut EdgeIndex` never leave them apart.

use std::collections::{BTreeSet, HashMap};

use crate::shared::messaging::UserId;

#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    forward: HashMap<UserId, BTreeSet<UserId>>,
    reverse: HashMap<UserId, BTreeSet<UserId>>,
}

impl EdgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `follower -> followed`. Returns false if the edge was already present.
    ///
    /// Self-edges are refused and reported as unchanged.
    pub fn insert(&mut self, follower: UserId, followed: UserId) -> bool {
        if follower == followed {
            return false;
        }
        let added = self.forward.entry(follower).or_default().insert(followed);
        self.reverse.entry(followed).or_default().insert(follower);
        added
    }

    /// Remove `follower -> followed`. Returns false if the edge was absent.
    pub fn remove(&mut self, follower: UserId, followed: UserId) -> bool {
        let removed = remove_from(&mut self.forward, follower, followed);
        remove_from(&mut self.reverse, followed, follower);
        removed
    }

    pub fn contains(&self, follower: UserId, followed: UserId) -> bool {
        self.forward
            .get(&follower)
            .is_some_and(|set| set.contains(&followed))
    }

    /// Users followed by `user`
    pub fn following(&self, user: UserId) -> BTreeSet<UserId> {
        self.forward.get(&user).cloned().unwrap_or_default()
    }

    /// Users following `user`
    pub fn followers(&self, user: UserId) -> BTreeSet<UserId> {
        self.reverse.get(&user).cloned().unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    /// Every edge as `(follower, followed)`, sorted
    pub fn edges(&self) -> Vec<(UserId, UserId)> {
        let mut edges: Vec<(UserId, UserId)> = self
            .forward
            .iter()
            .flat_map(|(follower, set)| set.iter().map(move |followed| (*follower, *followed)))
            .collect();
        edges.sort();
        edges
    }

    /// Whether the reverse map is exactly the inverse of the forward map
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.forward.iter().all(|(follower, set)| {
            set.iter().all(|followed| {
                follower != followed
                    && self
                        .reverse
                        .get(followed)
                        .is_some_and(|back| back.contains(follower))
            })
        });
        let reverse_count: usize = self.reverse.values().map(BTreeSet::len).sum();
        forward_ok && reverse_count == self.edge_count()
    }
}

fn remove_from(
    map: &mut HashMap<UserId, BTreeSet<UserId>>,
    key: UserId,
    value: UserId,
) -> bool {
    let Some(set) = map.get_mut(&key) else {
        return false;
    };
    let removed = set.remove(&value);
    if set.is_empty() {
        map.remove(&key);
    }
    removed
}
