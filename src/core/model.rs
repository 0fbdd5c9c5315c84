//! # Domain Model
//!
//! The three things chitchat knows about: who is signed in (`Session`),
//! what has been said (`Message`), and what the viewer wants to say
//! (`NewMessage`).
//!
//! ```text
//! Session ──(submit)──▶ NewMessage ──(store insert)──▶ Message
//!   uid, name, photo        no timestamp                 id + server createdAt
//! ```
//!
//! `NewMessage` deliberately has no timestamp field. The store assigns
//! `created_at` at write time, so ordering never depends on a client clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image shown for authors without a profile picture.
pub const DEFAULT_AVATAR_URL: &str = "https://i.imgur.com/rFbS5ms.png";

/// The authenticated viewer, as reported by the identity provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub display_name: String,
    pub uid: String,
    pub photo_url: Option<String>,
}

/// A persisted chat message. Owned by the store, mirrored locally.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Store-assigned identifier, used as the render key.
    pub id: String,
    /// Author display name at the time of writing.
    pub user: String,
    /// Author unique identifier.
    pub uid: String,
    pub photo_url: Option<String>,
    pub body: String,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
}

/// An insert request. The store fills in `id` and `created_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub user: String,
    pub uid: String,
    pub photo_url: Option<String>,
    pub body: String,
}

impl NewMessage {
    /// Stamps the author fields from the current session.
    pub fn from_session(session: &Session, body: impl Into<String>) -> Self {
        Self {
            user: session.display_name.clone(),
            uid: session.uid.clone(),
            photo_url: session.photo_url.clone(),
            body: body.into(),
        }
    }
}

/// Which side of the feed a message belongs to, relative to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Own,
    Other,
}

impl Ownership {
    pub fn of(message: &Message, viewer_uid: &str) -> Self {
        if message.uid == viewer_uid {
            Ownership::Own
        } else {
            Ownership::Other
        }
    }
}

/// Avatar source for a message bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Photo(String),
    Default,
}

impl Avatar {
    pub fn of(message: &Message) -> Self {
        match message.photo_url.as_deref() {
            Some(url) if !url.is_empty() => Avatar::Photo(url.to_string()),
            _ => Avatar::Default,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Avatar::Photo(url) => url,
            Avatar::Default => DEFAULT_AVATAR_URL,
        }
    }
}
