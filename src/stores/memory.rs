//! # In-Memory Stores
//!
//! Process-local implementations of the store traits. They back tests and
//! local demos, and expose knobs to inject failures and to hold writes in
//! flight so that optimistic and cancellation paths can be exercised.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use super::{ContentStore, EdgeChange, FollowGraphStore, MessageStore, StoreError, UserDirectory};
use crate::shared::content::{Comment, Movie, MovieId, Recommendation, RecommendationId};
use crate::shared::messaging::{Message, MessageId, User, UserId};

/// In-memory user directory
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
    failing: RwLock<HashSet<UserId>>,
    fail_all: AtomicBool,
    list_delay: RwLock<Option<Duration>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Make lookups of one user fail
    pub async fn fail_lookups_for(&self, id: UserId) {
        self.failing.write().await.insert(id);
    }

    /// Make every call fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_all.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every `list_users` call
    pub async fn set_list_delay(&self, delay: Option<Duration>) {
        *self.list_delay.write().await = delay;
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        if self.fail_all.load(Ordering::SeqCst) || self.failing.read().await.contains(&id) {
            return Err(StoreError::unavailable("user directory unavailable"));
        }
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("user {}", id)))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let delay = *self.list_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("user directory unavailable"));
        }
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

/// In-memory follow edge store
#[derive(Debug, Default)]
pub struct InMemoryFollowGraphStore {
    edges: RwLock<HashSet<(UserId, UserId)>>,
    fail_writes: AtomicBool,
}

impl InMemoryFollowGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains_edge(&self, follower: UserId, followed: UserId) -> bool {
        self.edges.read().await.contains(&(follower, followed))
    }

    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }
}

#[async_trait]
impl FollowGraphStore for InMemoryFollowGraphStore {
    async fn add_edge(&self, follower: UserId, followed: UserId) -> Result<EdgeChange, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("follow store write failed"));
        }
        if self.edges.write().await.insert((follower, followed)) {
            Ok(EdgeChange::Applied)
        } else {
            Ok(EdgeChange::Unchanged)
        }
    }

    async fn remove_edge(
        &self,
        follower: UserId,
        followed: UserId,
    ) -> Result<EdgeChange, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("follow store write failed"));
        }
        if self.edges.write().await.remove(&(follower, followed)) {
            Ok(EdgeChange::Applied)
        } else {
            Ok(EdgeChange::Unchanged)
        }
    }
}

/// Where a held `create_message` call waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPoint {
    /// Wait before the message is stored: polls do not see it yet
    BeforePersist,
    /// Store the message, then wait before answering: polls see it first
    AfterPersist,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// In-memory message store
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<Message>>,
    next_id: AtomicI64,
    clock: Clock,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    read_delay: RwLock<Option<Duration>>,
    hold: RwLock<Option<HoldPoint>>,
    gate: watch::Sender<bool>,
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMessageStore")
            .field("next_id", &self.next_id)
            .field("reads", &self.reads)
            .finish_non_exhaustive()
    }
}

impl InMemoryMessageStore {
    /// Store stamping messages with the wall clock
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Store stamping messages with `clock`
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        let (gate, _) = watch::channel(true);
        Self {
            messages: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            clock: Arc::new(clock),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            read_delay: RwLock::new(None),
            hold: RwLock::new(None),
            gate,
        }
    }

    /// Persist a message directly, as if sent from another client
    pub async fn insert_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Message {
        let message = Message {
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            sender_id: sender,
            receiver_id: receiver,
            content: content.to_string(),
            sent_at,
            is_read: false,
        };
        self.messages.write().await.push(message.clone());
        message
    }

    /// Store a record verbatim, duplicates included
    pub async fn push_raw(&self, message: Message) {
        self.messages.write().await.push(message);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every history read
    pub async fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.write().await = delay;
    }

    /// Number of `list_messages_between` calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Hold subsequent `create_message` calls at `point` until [`release`](Self::release)
    pub async fn hold_creates(&self, point: HoldPoint) {
        *self.hold.write().await = Some(point);
        self.gate.send_replace(false);
    }

    /// Let held `create_message` calls continue
    pub async fn release(&self) {
        *self.hold.write().await = None;
        self.gate.send_replace(true);
    }

    async fn wait_for_release(&self) {
        let mut rx = self.gate.subscribe();
        // The sender lives as long as the store, so this only returns once released.
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn list_messages_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.read_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("message store read failed"));
        }
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.is_between(a, b))
            .cloned()
            .collect())
    }

    async fn create_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: String,
    ) -> Result<Message, StoreError> {
        let hold = *self.hold.read().await;
        if hold == Some(HoldPoint::BeforePersist) {
            self.wait_for_release().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("message store write failed"));
        }
        let message = Message {
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            sender_id: sender,
            receiver_id: receiver,
            content,
            sent_at: (self.clock)(),
            is_read: false,
        };
        self.messages.write().await.push(message.clone());
        if hold == Some(HoldPoint::AfterPersist) {
            self.wait_for_release().await;
        }
        Ok(message)
    }
}

/// In-memory content store
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    recommendations: RwLock<Vec<Recommendation>>,
    movies: RwLock<HashMap<MovieId, Movie>>,
    comments: RwLock<Vec<Comment>>,
    failing_authors: RwLock<HashSet<UserId>>,
    fail_movies: AtomicBool,
    read_delay: RwLock<Option<Duration>>,
    movie_reads: AtomicUsize,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_recommendation(&self, recommendation: Recommendation) {
        self.recommendations.write().await.push(recommendation);
    }

    pub async fn add_movie(&self, movie: Movie) {
        self.movies.write().await.insert(movie.id, movie);
    }

    pub async fn add_comment(&self, comment: Comment) {
        self.comments.write().await.push(comment);
    }

    /// Make recommendation reads for one author fail
    pub async fn fail_author(&self, author: UserId) {
        self.failing_authors.write().await.insert(author);
    }

    pub fn set_fail_movies(&self, fail: bool) {
        self.fail_movies.store(fail, Ordering::SeqCst);
    }

    /// Delay every recommendation read
    pub async fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.write().await = delay;
    }

    /// Number of `get_movie` calls served so far
    pub fn movie_read_count(&self) -> usize {
        self.movie_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get_recommendations_by_author(
        &self,
        author: UserId,
    ) -> Result<Vec<Recommendation>, StoreError> {
        let delay = *self.read_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_authors.read().await.contains(&author) {
            return Err(StoreError::unavailable(format!(
                "recommendations for {} unavailable",
                author
            )));
        }
        Ok(self
            .recommendations
            .read()
            .await
            .iter()
            .filter(|r| r.author_id == author)
            .cloned()
            .collect())
    }

    async fn get_movie(&self, id: MovieId) -> Result<Movie, StoreError> {
        self.movie_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_movies.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("movie catalogue unavailable"));
        }
        self.movies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("movie {}", id)))
    }

    async fn get_comments(
        &self,
        recommendation: RecommendationId,
    ) -> Result<Vec<Comment>, StoreError> {
        Ok(self
            .comments
            .read()
            .await
            .iter()
            .filter(|c| c.recommendation_id == recommendation)
            .cloned()
            .collect())
    }
}
