//! Store fixtures
//!
//! A `World` wires in-memory stores into a follow graph, a conversation
//! synchronizer for one local user, and a feed aggregator.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

use cinesync::feed::FeedAggregator;
use cinesync::graph::FollowGraph;
use cinesync::shared::content::{MovieId, Recommendation, RecommendationId};
use cinesync::shared::messaging::{User, UserId};
use cinesync::shared::{telemetry, SyncConfig};
use cinesync::stores::memory::{
    InMemoryContentStore, InMemoryFollowGraphStore, InMemoryMessageStore, InMemoryUserDirectory,
};
use cinesync::sync::ConversationSynchronizer;

/// Poll interval used by the fixtures
pub const POLL: Duration = Duration::from_secs(5);

pub struct World {
    pub me: UserId,
    pub graph: Arc<FollowGraph>,
    pub edges: Arc<InMemoryFollowGraphStore>,
    pub messages: Arc<InMemoryMessageStore>,
    pub content: Arc<InMemoryContentStore>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub sync: ConversationSynchronizer,
    pub feed: FeedAggregator,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        telemetry::init_tracing("cinesync=warn");
        let me = UserId::new();
        let edges = Arc::new(InMemoryFollowGraphStore::new());
        let graph = Arc::new(FollowGraph::new(edges.clone()));
        let messages = Arc::new(InMemoryMessageStore::new());
        let content = Arc::new(InMemoryContentStore::new());
        let directory = Arc::new(InMemoryUserDirectory::new());

        let sync = ConversationSynchronizer::new(
            me,
            graph.clone(),
            messages.clone(),
            directory.clone(),
            config.clone(),
        )
        .expect("valid synchronizer config");
        let feed = FeedAggregator::new(graph.clone(), content.clone(), directory.clone(), config)
            .expect("valid feed config");

        Self {
            me,
            graph,
            edges,
            messages,
            content,
            directory,
            sync,
            feed,
        }
    }

    /// Register a user the local user follows
    pub async fn followed_user(&self, name: &str) -> UserId {
        let id = UserId::new();
        self.directory.insert(User::new(id, name)).await;
        self.graph
            .follow(self.me, id)
            .await
            .expect("follow should succeed");
        id
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

pub fn test_config() -> SyncConfig {
    SyncConfig::builder()
        .poll_interval(POLL)
        .failure_notice_interval(Duration::from_secs(60))
        .feed_fetch_concurrency(4)
        .build()
        .expect("valid test config")
}

/// A calendar date at midnight UTC
pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn recommendation(id: i64, author: UserId, created_at: DateTime<Utc>) -> Recommendation {
    Recommendation {
        id: RecommendationId(id),
        author_id: author,
        movie_id: MovieId(id % 3),
        content: format!("you should watch this ({})", id),
        created_at,
        comment_count: Some(0),
    }
}
