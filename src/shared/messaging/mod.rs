//! Messaging Module
//!
//! This module contains the data structures for direct messaging:
//!
//! - `UserId`, `User`, `UserSummary` - identities and contact entries
//! - `Message`, `PendingMessage`, `DisplayedMessage` - persisted and optimistic messages
//! - `ConversationKey` - the unordered participant pair of a conversation
//!
//! # Usage
//!
//! ```rust
//! use cinesync::shared::messaging::{ConversationKey, UserId};
//!
//! let (a, b) = (UserId::new(), UserId::new());
//! assert_eq!(ConversationKey::new(a, b), ConversationKey::new(b, a));
//! ```

pub mod contact;
pub mod conversation;
pub mod message;

// Re-export all types
pub use contact::{User, UserId, UserSummary};
pub use conversation::ConversationKey;
pub use message::{DisplayedMessage, Message, MessageId, PendingMessage, Tiebreak};
