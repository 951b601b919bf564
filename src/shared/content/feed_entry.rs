//! Feed Entry
//!
//! A read-only projection of a recommendation plus the data needed to render
//! it in a feed. It has no identity beyond the recommendation id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::movie::MovieSummary;
use super::recommendation::{Recommendation, RecommendationId};
use crate::shared::messaging::UserId;

/// Author data shown next to a feed entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorSummary {
    pub id: UserId,
    /// Absent when the user directory could not resolve the author
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    pub recommendation: Recommendation,
    pub author: AuthorSummary,
    /// Absent when the movie lookup failed
    pub movie: Option<MovieSummary>,
}

impl FeedEntry {
    /// Entry with no decoration beyond the author id
    pub fn bare(recommendation: Recommendation) -> Self {
        let author = AuthorSummary {
            id: recommendation.author_id,
            display_name: None,
        };
        Self {
            recommendation,
            author,
            movie: None,
        }
    }

    pub fn id(&self) -> RecommendationId {
        self.recommendation.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.recommendation.created_at
    }

    pub fn comment_count(&self) -> Option<u32> {
        self.recommendation.comment_count
    }

    /// Feed order: most recent first, ties by id descending
    pub fn feed_order(a: &FeedEntry, b: &FeedEntry) -> Ordering {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id()))
    }
}
