//! # Application State
//!
//! Core business state for chitchat. This module contains domain logic only -
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── identity: Arc<dyn IdentityProvider>  // auth capability
//! ├── store: Arc<dyn DocumentStore>        // message store capability
//! ├── auth: AuthState                      // session gate
//! ├── sign_in: SignInStatus                // prompt progress
//! ├── feed: Option<Feed>                   // mounted only while signed in
//! ├── next_subscription: u64               // id for the next mounted feed
//! └── status_message: String               // status bar text
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use crate::backend::{DocumentStore, IdentityProvider, SignInChallenge};
use crate::core::feed::Feed;
use crate::core::model::Session;

/// What the session gate currently knows about the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// The provider has not reported yet.
    #[default]
    Unresolved,
    Anonymous,
    Authenticated(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

/// Progress of the interactive sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignInStatus {
    #[default]
    Idle,
    /// Flow started, waiting for the provider.
    Pending,
    /// Provider asked the viewer to confirm on another device.
    AwaitingUser(SignInChallenge),
}

pub struct App {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub auth: AuthState,
    pub sign_in: SignInStatus,
    pub feed: Option<Feed>,
    pub next_subscription: u64,
    pub status_message: String,
}

impl App {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            store,
            auth: AuthState::Unresolved,
            sign_in: SignInStatus::Idle,
            feed: None,
            next_subscription: 1,
            status_message: String::new(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.auth.session()
    }

    /// Mounts a fresh feed and returns its subscription id.
    pub(crate) fn mount_feed(&mut self) -> u64 {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.feed = Some(Feed::new(id));
        id
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{session, test_app};

    use super::*;

    #[test]
    fn test_app_new_defaults() {
        let app = test_app();
        assert_eq!(app.auth, AuthState::Unresolved);
        assert_eq!(app.sign_in, SignInStatus::Idle);
        assert!(app.feed.is_none());
        assert!(app.session().is_none());
    }

    #[test]
    fn mount_feed_hands_out_fresh_ids() {
        let mut app = test_app();
        let first = app.mount_feed();
        let second = app.mount_feed();
        assert_ne!(first, second);
        assert_eq!(app.feed.as_ref().map(|f| f.subscription), Some(second));
    }

    #[test]
    fn session_only_when_authenticated() {
        assert!(AuthState::Anonymous.session().is_none());
        let state = AuthState::Authenticated(session());
        assert_eq!(state.session().map(|s| s.uid.as_str()), Some("u1"));
    }
}
