//! CineSync - Synchronization Core
//!
//! The synchronization core of a social movie-recommendation client: the
//! follow graph, direct-message conversations kept live by polling, and the
//! recommendation feed built from followed authors.
//!
//! # Overview
//!
//! This library provides:
//! - A follow graph whose forward and reverse projections never disagree
//! - A conversation synchronizer with optimistic sends and cancellable polling
//! - A feed aggregator with partial-failure tolerance
//! - Async store traits and in-memory adapters for the external services
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by every component
//!   - Identities, messages, recommendations, feed entries
//!   - Error taxonomy, configuration, tracing bootstrap
//!
//! - **`stores`** - The external collaborators
//!   - `UserDirectory`, `FollowGraphStore`, `MessageStore`, `ContentStore`
//!   - In-memory adapters with failure injection
//!
//! - **`graph`** - The follow graph
//!
//! - **`sync`** - The conversation synchronizer
//!   - Timeline merge, optimistic ledger, poll scheduler, failure notices
//!
//! - **`feed`** - The feed aggregator
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cinesync::graph::FollowGraph;
//! use cinesync::shared::{telemetry, SyncConfig, UserId};
//! use cinesync::stores::memory::InMemoryFollowGraphStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! telemetry::init_tracing("cinesync=info");
//! let config = SyncConfig::from_env()?;
//! let graph = Arc::new(FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new())));
//! graph.follow(UserId::new(), UserId::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - The follow graph serializes mutations and guards its index with a `RwLock`
//! - Each synchronizer owns its conversation state behind a `Mutex` and
//!   publishes views through a `watch` channel
//! - Background polling is tied to a `CancellationToken`; responses for an
//!   abandoned conversation or feed are discarded
//!
//! # Error Handling
//!
//! Every fallible operation returns [`shared::SyncResult`]. Store adapters
//! report [`stores::StoreError`], which is mapped onto
//! [`shared::SyncError`] at the component boundary. No error is fatal; each
//! can be retried.

/// Shared types and data structures
pub mod shared;

/// External store interfaces and in-memory adapters
pub mod stores;

/// Follow graph
pub mod graph;

/// Conversation synchronizer
pub mod sync;

/// Feed aggregator
pub mod feed;

pub use feed::{FeedAggregator, FeedMode, FeedPage};
pub use graph::FollowGraph;
pub use shared::{SyncConfig, SyncError, SyncResult};
pub use sync::{ConversationPhase, ConversationSynchronizer, ConversationView};
