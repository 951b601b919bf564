//! Recommendation and Comment Data Structures
//!
//! A recommendation is a user's write-up about a movie. Many recommendations
//! may target the same movie. This core only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::movie::MovieId;
use crate::shared::messaging::UserId;

/// Store-assigned recommendation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationId(pub i64);

impl fmt::Display for RecommendationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents a recommendation as served by the content store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub author_id: UserId,
    pub movie_id: MovieId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Number of comments, when the store includes it in list responses
    #[serde(default)]
    pub comment_count: Option<u32>,
}

/// Store-assigned comment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub i64);

/// A comment on a recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub recommendation_id: RecommendationId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
