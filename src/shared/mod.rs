//! Shared Module
//!
//! This module contains the types used across the synchronization core:
//! identities, messages, recommendations, errors and configuration.
//!
//! # Overview
//!
//! The shared module is behaviour-free. The follow graph, the conversation
//! synchronizer and the feed aggregator all speak in these types, and so do
//! the store adapters behind them.

/// Error types
pub mod error;

/// Configuration
pub mod config;

/// Tracing bootstrap
pub mod telemetry;

/// Identities, direct messages and conversations
pub mod messaging;

/// Recommendations, comments, movies and feed entries
pub mod content;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use error::{SyncError, SyncResult};
pub use messaging::{ConversationKey, DisplayedMessage, Message, MessageId, User, UserId, UserSummary};
