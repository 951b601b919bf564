//! Sync Error Types
//!
//! This module defines the errors surfaced by the follow graph, the
//! conversation synchronizer and the feed aggregator. Every variant is
//! recoverable by retrying the same operation.
//!
//! # Error Categories
//!
//! - `InvalidOperation` - a request the graph refuses outright (self-follow)
//! - `NotAuthorized` - sending to a peer the local user does not follow
//! - `SendFailed` - the message store rejected a send; the optimistic entry was rolled back
//! - `FetchFailed` - a read from the message or content store failed
//! - `PartialFetchFailure` - strict-mode feed aggregation where some author fetch failed
//!
//! # Usage
//!
//! ```rust
//! use cinesync::shared::error::SyncError;
//!
//! let error = SyncError::fetch_failed("message store timed out");
//! assert!(error.to_string().contains("timed out"));
//! ```
use thiserror::Error;

use crate::shared::messaging::UserId;
use crate::stores::StoreError;

/// Errors raised by the synchronization core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Operation rejected by the follow graph
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Human-readable error message
        message: String,
    },

    /// The local user may not message the peer
    #[error("User {from} is not allowed to message {to}")]
    NotAuthorized {
        /// Local user
        from: UserId,
        /// Peer that is not in the local user's following set
        to: UserId,
    },

    /// Persisting a message failed
    #[error("Send failed: {message}")]
    SendFailed {
        /// Human-readable error message
        message: String,
    },

    /// A store read failed
    #[error("Fetch failed: {message}")]
    FetchFailed {
        /// Human-readable error message
        message: String,
    },

    /// Strict feed aggregation where one or more authors could not be fetched
    #[error("Feed fetch failed for {} author(s)", failed_authors.len())]
    PartialFetchFailure {
        /// Authors whose recommendations could not be fetched
        failed_authors: Vec<UserId>,
    },

    /// Message content was empty after trimming
    #[error("Message content cannot be empty")]
    EmptyContent,

    /// No conversation is selected
    #[error("No conversation is selected")]
    NoActiveConversation,

    /// The follow graph store rejected a mutation
    #[error("Follow graph update failed: {message}")]
    GraphUpdateFailed {
        /// Human-readable error message
        message: String,
    },

    /// The operation was abandoned before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Create a new invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a new send failure
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed {
            message: message.into(),
        }
    }

    /// Create a new fetch failure
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    /// Create a new graph update failure
    pub fn graph_update_failed(message: impl Into<String>) -> Self {
        Self::GraphUpdateFailed {
            message: message.into(),
        }
    }

    /// Map a store error raised while reading
    pub fn from_read(err: StoreError) -> Self {
        Self::fetch_failed(err.to_string())
    }

    /// Map a store error raised while creating a message
    pub fn from_send(err: StoreError) -> Self {
        Self::send_failed(err.to_string())
    }

    /// Whether retrying the same call later may succeed without any change
    /// on the caller's side
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SendFailed { .. }
                | Self::FetchFailed { .. }
                | Self::PartialFetchFailure { .. }
                | Self::GraphUpdateFailed { .. }
                | Self::Cancelled
        )
    }
}

/// Result alias used throughout the crate
pub type SyncResult<T> = Result<T, SyncError>;
