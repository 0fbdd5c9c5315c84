//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::backend::{MemoryIdentity, MemoryStore};
use crate::core::action::{Action, update};
use crate::core::model::{Message, Session};
use crate::core::state::{App, AuthState};

/// The viewer most tests sign in as.
pub fn session() -> Session {
    Session {
        display_name: "Alice".to_string(),
        uid: "u1".to_string(),
        photo_url: None,
    }
}

/// A message by `uid`, created `secs` seconds after a fixed base time.
pub fn message(id: &str, uid: &str, secs: i64) -> Message {
    let base = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap();
    Message {
        id: id.to_string(),
        user: format!("user {uid}"),
        uid: uid.to_string(),
        photo_url: None,
        body: format!("message {id}"),
        created_at: base + TimeDelta::seconds(secs),
    }
}

/// Creates a test App backed by the in-memory backend.
pub fn test_app() -> App {
    App::new(
        Arc::new(MemoryIdentity::new(session())),
        Arc::new(MemoryStore::new()),
    )
}

/// A test App signed in as [`session()`] with its feed mounted.
pub fn signed_in_app() -> App {
    let mut app = test_app();
    update(&mut app, Action::AuthChanged(AuthState::Anonymous));
    update(&mut app, Action::AuthChanged(AuthState::Authenticated(session())));
    app
}
