use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::core::feed::FeedQuery;
use crate::core::model::{Message, NewMessage, Session};
use crate::core::state::AuthState;

/// Errors that can occur talking to the identity provider or the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend misconfigured (missing API key, bad URL). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// Service returned an error response.
    Api { status: u16, message: String },
    /// Failed to parse the service's response.
    Parse(String),
    /// No valid session (never signed in, signed out, or refresh rejected).
    Unauthenticated,
    /// Viewer declined the sign-in request.
    SignInDenied,
    /// Viewer did not confirm the sign-in request in time.
    SignInExpired,
    /// The receiving side went away.
    ChannelClosed,
    /// The backend's own state is unusable (a poisoned lock).
    Internal(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Config(msg) => write!(f, "config error: {msg}"),
            BackendError::Network(msg) => write!(f, "network error: {msg}"),
            BackendError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            BackendError::Parse(msg) => write!(f, "parse error: {msg}"),
            BackendError::Unauthenticated => write!(f, "not signed in"),
            BackendError::SignInDenied => write!(f, "sign-in was denied"),
            BackendError::SignInExpired => write!(f, "sign-in code expired"),
            BackendError::ChannelClosed => write!(f, "channel closed"),
            BackendError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Parse(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// Instructions the viewer must follow on another device to finish signing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInChallenge {
    pub verification_url: String,
    pub user_code: String,
    /// Seconds until the code stops working.
    pub expires_in: u64,
}

/// One delivery from a live query.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Full current result set, ascending by creation time.
    Snapshot(Vec<Message>),
    /// The query failed. No further events follow.
    Failed(BackendError),
}

/// Handle to a running live query.
///
/// Dropping the handle (or calling [`cancel`](Self::cancel)) stops the
/// query. After that the store delivers nothing more, even if it was in the
/// middle of producing a snapshot.
pub struct Subscription {
    active: Arc<AtomicBool>,
    tasks: Vec<AbortHandle>,
}

impl Subscription {
    pub fn new(active: Arc<AtomicBool>, tasks: Vec<AbortHandle>) -> Self {
        Self { active, tasks }
    }

    /// Attach another task whose lifetime should follow this subscription.
    pub fn attach(&mut self, task: AbortHandle) {
        self.tasks.push(task);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn cancel(&mut self) {
        self.active.store(false, Ordering::Release);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Sends `event` only while the subscription is still active.
/// Returns false once the subscription or the receiver is gone.
pub fn deliver(active: &AtomicBool, sender: &UnboundedSender<FeedEvent>, event: FeedEvent) -> bool {
    if !active.load(Ordering::Acquire) {
        return false;
    }
    sender.send(event).is_ok()
}

/// Authentication capability.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Live view of the auth state. Starts at `Unresolved`.
    fn watch(&self) -> watch::Receiver<AuthState>;

    /// The signed-in viewer, if any.
    fn current_session(&self) -> Option<Session> {
        self.watch().borrow().session().cloned()
    }

    /// Determines the initial auth state (e.g. restores a saved session).
    async fn resolve(&self) -> Result<(), BackendError>;

    /// Runs the interactive sign-in flow, publishing any challenge the
    /// viewer must answer on `challenges`.
    async fn sign_in(
        &self,
        challenges: UnboundedSender<SignInChallenge>,
    ) -> Result<Session, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;
}

/// Message store capability.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the name of the store.
    fn name(&self) -> &str;

    /// Starts a live query. Every change to its result set is delivered to
    /// `sender` as a full [`FeedEvent::Snapshot`].
    fn subscribe(&self, query: FeedQuery, sender: UnboundedSender<FeedEvent>) -> Subscription;

    /// Writes a new message. The store assigns the id and the creation
    /// timestamp. Returns the new document id once the write is acknowledged.
    async fn insert(&self, message: NewMessage) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliver_stops_once_inactive() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let active = AtomicBool::new(true);
        assert!(deliver(&active, &tx, FeedEvent::Snapshot(Vec::new())));
        active.store(false, Ordering::Release);
        assert!(!deliver(&active, &tx, FeedEvent::Snapshot(Vec::new())));
        assert_eq!(rx.try_recv().ok(), Some(FeedEvent::Snapshot(Vec::new())));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropping_subscription_deactivates_it() {
        let active = Arc::new(AtomicBool::new(true));
        let sub = Subscription::new(active.clone(), Vec::new());
        assert!(sub.is_active());
        drop(sub);
        assert!(!active.load(Ordering::Acquire));
    }

    #[test]
    fn error_display() {
        let err = BackendError::Api {
            status: 403,
            message: "PERMISSION_DENIED".into(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 403): PERMISSION_DENIED");
        assert_eq!(BackendError::Unauthenticated.to_string(), "not signed in");
    }
}
