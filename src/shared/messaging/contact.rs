//! User and Contact Data Structures
//!
//! Represents the users of the social graph as the core sees them: an opaque
//! identity, a display name and the two projections of the follow relation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Opaque unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user record as served by the user directory
///
/// `following_ids` and `follower_ids` are the forward and reverse projections
/// of the follow graph. A user never appears in its own sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user ID
    pub id: UserId,
    /// Name shown in contact lists and feeds
    pub display_name: String,
    /// Optional forename, as entered at registration
    #[serde(default)]
    pub forename: Option<String>,
    /// Optional surname, as entered at registration
    #[serde(default)]
    pub surname: Option<String>,
    /// Users this user follows
    #[serde(default)]
    pub following_ids: BTreeSet<UserId>,
    /// Users following this user
    #[serde(default)]
    pub follower_ids: BTreeSet<UserId>,
}

impl User {
    /// Create a user with no edges
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            forename: None,
            surname: None,
            following_ids: BTreeSet::new(),
            follower_ids: BTreeSet::new(),
        }
    }

    /// Full name when both parts are known
    pub fn full_name(&self) -> Option<String> {
        match (&self.forename, &self.surname) {
            (Some(fore), Some(sur)) => Some(format!("{} {}", fore, sur)),
            _ => None,
        }
    }

    /// Summary used in contact lists and feed entries
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            display_name: self.display_name.clone(),
            full_name: self.full_name(),
        }
    }
}

/// Lightweight view of a user for contact lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
    pub full_name: Option<String>,
}

impl UserSummary {
    /// Get avatar initial (first letter of the display name)
    pub fn avatar_initial(&self) -> char {
        self.display_name
            .chars()
            .next()
            .unwrap_or('?')
            .to_ascii_uppercase()
    }
}
