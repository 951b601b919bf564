//! # External Stores
//!
//! The synchronization core does not own persistence. It talks to four
//! collaborators through the traits in this module:
//!
//! - [`UserDirectory`] - user records, including both follow projections
//! - [`FollowGraphStore`] - durable follow edges behind the follow graph
//! - [`MessageStore`] - direct message history and creation
//! - [`ContentStore`] - recommendations, comments and movies
//!
//! Adapters report failures as [`StoreError`]; the core maps them onto its
//! own error taxonomy at the call site. In-memory adapters with failure
//! injection live in [`memory`].

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::shared::content::{Comment, Movie, MovieId, Recommendation, RecommendationId};
use crate::shared::messaging::{Message, User, UserId};

/// Errors raised by store adapters
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or timed out
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
    /// The store refused the request
    #[error("store rejected request: {message}")]
    Rejected { message: String },
    /// The requested record does not exist
    #[error("not found: {what}")]
    NotFound { what: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

/// Outcome of an idempotent edge write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    /// The store changed state
    Applied,
    /// The store was already in the requested state
    Unchanged,
}

/// Read access to user records
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one user, including `following_ids` and `follower_ids`
    async fn get_user(&self, id: UserId) -> Result<User, StoreError>;

    /// Fetch every user
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// Durable storage of follow edges
///
/// Both writes are idempotent and distinguish "already in that state"
/// ([`EdgeChange::Unchanged`]) from failure.
#[async_trait]
pub trait FollowGraphStore: Send + Sync {
    async fn add_edge(&self, follower: UserId, followed: UserId) -> Result<EdgeChange, StoreError>;

    async fn remove_edge(&self, follower: UserId, followed: UserId)
        -> Result<EdgeChange, StoreError>;
}

/// Direct message persistence
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Every message exchanged between the two users, in no particular order
    async fn list_messages_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>, StoreError>;

    /// Persist a message; the store assigns `id` and `sent_at`
    async fn create_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: String,
    ) -> Result<Message, StoreError>;
}

/// Recommendation, comment and movie reads
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_recommendations_by_author(
        &self,
        author: UserId,
    ) -> Result<Vec<Recommendation>, StoreError>;

    async fn get_movie(&self, id: MovieId) -> Result<Movie, StoreError>;

    async fn get_comments(&self, recommendation: RecommendationId)
        -> Result<Vec<Comment>, StoreError>;
}
