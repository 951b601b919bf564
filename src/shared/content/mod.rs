//! Content Module
//!
//! Recommendation, comment and movie types read from the content store, and
//! the feed entry projection built from them.

pub mod feed_entry;
pub mod movie;
pub mod recommendation;

pub use feed_entry::{AuthorSummary, FeedEntry};
pub use movie::{Movie, MovieId, MovieSummary};
pub use recommendation::{Comment, CommentId, Recommendation, RecommendationId};
