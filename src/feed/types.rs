//! Feed item type.

use chrono::{DateTime, Utc};

/// A listing fetched from a feed.
///
/// Items are never persisted; they live for a single poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable identifier, unique within the feed.
    pub id: String,
    /// Listing title.
    pub title: String,
    /// Link to the listing.
    pub url: String,
    /// Name of the feed the item came from.
    pub feed: String,
    /// When the item was fetched.
    pub observed_at: DateTime<Utc>,
}

impl Item {
    /// Create a new item observed now.
    pub fn new(
        feed: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            feed: feed.into(),
            observed_at: Utc::now(),
        }
    }

    /// Key used by the seen store.
    ///
    /// Ids are only unique within a feed, so the feed name is part of the key.
    pub fn dedup_key(&self) -> String {
        format!("{}/{}", self.feed, self.id)
    }
}
