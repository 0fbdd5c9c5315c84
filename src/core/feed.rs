//! # Message Feed
//!
//! The locally observed slice of the shared message collection, plus the
//! viewer's draft.
//!
//! The list is never edited in place. Each store notification replaces it
//! wholesale with the newest window, so whatever arrived last is what gets
//! rendered.

use crate::core::model::Message;

/// Collection every message lives in.
pub const MESSAGES_COLLECTION: &str = "messages";

/// Number of most recent messages kept in view.
pub const FEED_WINDOW: usize = 25;

/// Description of the live query the feed subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub collection: String,
    /// Keep only the last `limit` messages by creation time.
    pub limit: usize,
}

impl FeedQuery {
    /// The chat feed: `messages` ordered by `createdAt` ascending, last 25.
    pub fn latest() -> Self {
        Self {
            collection: MESSAGES_COLLECTION.to_string(),
            limit: FEED_WINDOW,
        }
    }
}

/// Orders messages by server timestamp ascending and keeps the last `limit`.
///
/// Ties on `created_at` are broken by id so that every client renders the
/// same order for the same snapshot.
pub fn window(messages: impl IntoIterator<Item = Message>, limit: usize) -> Vec<Message> {
    let mut messages: Vec<Message> = messages.into_iter().collect();
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let skip = messages.len().saturating_sub(limit);
    messages.drain(..skip);
    messages
}

/// State owned by a mounted feed. Discarded when the feed is unmounted.
#[derive(Debug, Default)]
pub struct Feed {
    /// Identifies the live subscription this feed listens to.
    /// Notifications tagged with any other id are stale.
    pub subscription: u64,
    pub messages: Vec<Message>,
    pub draft: String,
}

impl Feed {
    pub fn new(subscription: u64) -> Self {
        Self {
            subscription,
            messages: Vec::new(),
            draft: String::new(),
        }
    }

    /// The send control is enabled only when there is something to send.
    pub fn can_submit(&self) -> bool {
        !self.draft.is_empty()
    }
}
