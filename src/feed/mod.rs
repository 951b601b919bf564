//! # Feed Aggregator
//!
//! Builds the recommendation feed of a user from the authors they follow.
//!
//! ## Algorithm
//!
//! 1. `F = following(user)` from the follow graph; an empty `F` is an empty feed
//! 2. Recommendations of every author in `F` are fetched, a bounded number
//!    of authors at a time
//! 3. Results are merged, deduplicated by recommendation id and sorted by
//!    `created_at` descending, ties by id descending
//! 4. Entries are decorated with author and movie summaries. Decoration is
//!    best effort: a failed lookup leaves the field empty
//!
//! Each call is a fresh snapshot. A failed author fetch is reported next to
//! the partial result, or fails the whole call in strict mode.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use cinesync::feed::FeedAggregator;
//! use cinesync::graph::FollowGraph;
//! use cinesync::shared::{SyncConfig, UserId};
//! use cinesync::stores::memory::{InMemoryContentStore, InMemoryFollowGraphStore, InMemoryUserDirectory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = Arc::new(FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new())));
//! let feed = FeedAggregator::new(
//!     graph,
//!     Arc::new(InMemoryContentStore::new()),
//!     Arc::new(InMemoryUserDirectory::new()),
//!     SyncConfig::default(),
//! )?;
//! let page = feed.get_feed(UserId::new(), &CancellationToken::new()).await?;
//! assert!(page.entries.is_empty());
//! # Ok(())
//! # }
//! ```

use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::graph::FollowGraph;
use crate::shared::config::{ConfigError, SyncConfig};
use crate::shared::content::{
    AuthorSummary, Comment, FeedEntry, MovieId, MovieSummary, Recommendation, RecommendationId,
};
use crate::shared::error::{SyncError, SyncResult};
use crate::shared::messaging::UserId;
use crate::stores::{ContentStore, UserDirectory};

/// How author fetch failures affect a feed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Return what could be fetched and list the failures
    Lenient,
    /// Fail the call with `PartialFetchFailure` if any author fetch failed
    Strict,
}

/// An author whose recommendations could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorFailure {
    pub author: UserId,
    pub error: SyncError,
}

/// Result of one feed call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    /// Newest first
    pub entries: Vec<FeedEntry>,
    /// Authors left out of `entries`, ordered by id
    pub failures: Vec<AuthorFailure>,
}

impl FeedPage {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Feed aggregator over the follow graph and the content store
pub struct FeedAggregator {
    graph: Arc<FollowGraph>,
    content: Arc<dyn ContentStore>,
    directory: Arc<dyn UserDirectory>,
    config: SyncConfig,
}

impl std::fmt::Debug for FeedAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedAggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FeedAggregator {
    pub fn new(
        graph: Arc<FollowGraph>,
        content: Arc<dyn ContentStore>,
        directory: Arc<dyn UserDirectory>,
        config: SyncConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            graph,
            content,
            directory,
            config,
        })
    }

    /// Build the feed of `user`, in the mode selected by `strict_feed`
    pub async fn get_feed(&self, user: UserId, cancel: &CancellationToken) -> SyncResult<FeedPage> {
        let mode = if self.config.strict_feed {
            FeedMode::Strict
        } else {
            FeedMode::Lenient
        };
        self.get_feed_with_mode(user, mode, cancel).await
    }

    /// Build the feed of `user`
    ///
    /// Cancelling `cancel` abandons every outstanding fetch and returns
    /// `Cancelled`; nothing fetched so far is returned.
    pub async fn get_feed_with_mode(
        &self,
        user: UserId,
        mode: FeedMode,
        cancel: &CancellationToken,
    ) -> SyncResult<FeedPage> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[FEED] feed for {} cancelled", user);
                Err(SyncError::Cancelled)
            }
            page = self.build(user, mode) => page,
        }
    }

    /// Comments of one recommendation, newest first
    pub async fn comments_for(&self, recommendation: RecommendationId) -> SyncResult<Vec<Comment>> {
        let mut comments = self
            .content
            .get_comments(recommendation)
            .await
            .map_err(SyncError::from_read)?;
        comments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(comments)
    }

    async fn build(&self, user: UserId, mode: FeedMode) -> SyncResult<FeedPage> {
        let authors = self.graph.following(user).await;
        if authors.is_empty() {
            debug!("[FEED] {} follows nobody", user);
            return Ok(FeedPage::default());
        }

        let (recommendations, failures) = self.fetch_recommendations(&authors).await;
        if mode == FeedMode::Strict && !failures.is_empty() {
            let failed_authors: Vec<UserId> = failures.iter().map(|f| f.author).collect();
            warn!(
                "[FEED] strict feed for {} failed: {} of {} authors unavailable",
                user,
                failed_authors.len(),
                authors.len()
            );
            return Err(SyncError::PartialFetchFailure { failed_authors });
        }

        let mut entries = self.decorate(recommendations).await;
        entries.sort_by(FeedEntry::feed_order);

        info!(
            "[FEED] built feed for {}: {} entries from {} authors ({} failed)",
            user,
            entries.len(),
            authors.len(),
            failures.len()
        );
        Ok(FeedPage { entries, failures })
    }

    /// Fetch every author, deduplicating recommendations by id
    async fn fetch_recommendations(
        &self,
        authors: &BTreeSet<UserId>,
    ) -> (Vec<Recommendation>, Vec<AuthorFailure>) {
        let content = &self.content;
        let results: Vec<_> = stream::iter(authors.iter().copied())
            .map(|author| async move {
                (author, content.get_recommendations_by_author(author).await)
            })
            .buffer_unordered(self.config.feed_fetch_concurrency)
            .collect()
            .await;

        let mut by_id: BTreeMap<RecommendationId, Recommendation> = BTreeMap::new();
        let mut failures = Vec::new();
        for (author, result) in results {
            match result {
                Ok(recommendations) => {
                    for recommendation in recommendations {
                        if authors.contains(&recommendation.author_id) {
                            by_id.entry(recommendation.id).or_insert(recommendation);
                        }
                    }
                }
                Err(e) => {
                    warn!("[FEED] recommendations of {} unavailable: {}", author, e);
                    failures.push(AuthorFailure {
                        author,
                        error: SyncError::from_read(e),
                    });
                }
            }
        }
        failures.sort_by_key(|f| f.author);
        (by_id.into_values().collect(), failures)
    }

    /// Attach author and movie summaries; each distinct id is looked up once
    async fn decorate(&self, recommendations: Vec<Recommendation>) -> Vec<FeedEntry> {
        let author_ids: BTreeSet<UserId> = recommendations.iter().map(|r| r.author_id).collect();
        let movie_ids: BTreeSet<MovieId> = recommendations.iter().map(|r| r.movie_id).collect();
        let concurrency = self.config.feed_fetch_concurrency;

        let directory = &self.directory;
        let names: HashMap<UserId, String> = stream::iter(author_ids)
            .map(|id| async move { (id, directory.get_user(id).await) })
            .buffer_unordered(concurrency)
            .filter_map(|(id, result)| async move {
                match result {
                    Ok(user) => Some((id, user.display_name)),
                    Err(e) => {
                        debug!("[FEED] no author summary for {}: {}", id, e);
                        None
                    }
                }
            })
            .collect()
            .await;

        let content = &self.content;
        let movies: HashMap<MovieId, MovieSummary> = stream::iter(movie_ids)
            .map(|id| async move { (id, content.get_movie(id).await) })
            .buffer_unordered(concurrency)
            .filter_map(|(id, result)| async move {
                match result {
                    Ok(movie) => Some((id, movie.summary())),
                    Err(e) => {
                        debug!("[FEED] no movie summary for {}: {}", id, e);
                        None
                    }
                }
            })
            .collect()
            .await;

        recommendations
            .into_iter()
            .map(|recommendation| {
                let author = AuthorSummary {
                    id: recommendation.author_id,
                    display_name: names.get(&recommendation.author_id).cloned(),
                };
                let movie = movies.get(&recommendation.movie_id).cloned();
                FeedEntry {
                    recommendation,
                    author,
                    movie,
                }
            })
            .collect()
    }
}
