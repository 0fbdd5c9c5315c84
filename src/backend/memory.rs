//! In-process identity provider and message store.
//!
//! Used for offline runs (`--backend memory`) and tests. The store keeps the
//! same contract as the hosted one: ids and timestamps are assigned at write
//! time by the store, and every subscriber gets the full window again after
//! each write.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

use crate::backend::provider::{
    BackendError, DocumentStore, FeedEvent, IdentityProvider, SignInChallenge, Subscription,
    deliver,
};
use crate::core::feed::{FeedQuery, window};
use crate::core::model::{Message, NewMessage, Session};
use crate::core::state::AuthState;

// ============================================================================
// Identity
// ============================================================================

/// Identity provider that signs in a fixed profile without any prompt.
pub struct MemoryIdentity {
    profile: Session,
    state: watch::Sender<AuthState>,
}

impl MemoryIdentity {
    pub fn new(profile: Session) -> Self {
        let (state, _) = watch::channel(AuthState::Unresolved);
        Self { profile, state }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn name(&self) -> &str {
        "memory"
    }

    fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    async fn resolve(&self) -> Result<(), BackendError> {
        self.state.send_if_modified(|state| {
            if *state == AuthState::Unresolved {
                *state = AuthState::Anonymous;
                true
            } else {
                false
            }
        });
        Ok(())
    }

    async fn sign_in(
        &self,
        _challenges: UnboundedSender<SignInChallenge>,
    ) -> Result<Session, BackendError> {
        info!("Signing in local profile {}", self.profile.uid);
        self.state
            .send_replace(AuthState::Authenticated(self.profile.clone()));
        Ok(self.profile.clone())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.state.send_replace(AuthState::Anonymous);
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
struct Collection {
    messages: Vec<Message>,
    last_timestamp: Option<DateTime<Utc>>,
    next_id: u64,
}

/// Message store held in process memory.
pub struct MemoryStore {
    collection: Arc<Mutex<Collection>>,
    /// Bumped after every write; subscribers re-read on change.
    version: watch::Sender<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            collection: Arc::new(Mutex::new(Collection::default())),
            version,
        }
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.collection.lock().map(|c| c.messages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored messages, in write order.
    pub fn messages(&self) -> Vec<Message> {
        self.collection
            .lock()
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    fn snapshot(collection: &Mutex<Collection>, limit: usize) -> Result<Vec<Message>, BackendError> {
        let collection = collection
            .lock()
            .map_err(|_| BackendError::Internal("message store lock poisoned".into()))?;
        Ok(window(collection.messages.iter().cloned(), limit))
    }
}

/// Server clock: wall time, but never equal to or behind the previous write.
fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + TimeDelta::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn subscribe(&self, query: FeedQuery, sender: UnboundedSender<FeedEvent>) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        let collection = self.collection.clone();
        let mut version = self.version.subscribe();
        let task_active = active.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = match MemoryStore::snapshot(&collection, query.limit) {
                    Ok(messages) => FeedEvent::Snapshot(messages),
                    Err(e) => FeedEvent::Failed(e),
                };
                let failed = matches!(event, FeedEvent::Failed(_));
                if !deliver(&task_active, &sender, event) || failed {
                    return;
                }
                if version.changed().await.is_err() {
                    debug!("Memory store dropped, ending live query");
                    return;
                }
            }
        });

        Subscription::new(active, vec![task.abort_handle()])
    }

    async fn insert(&self, message: NewMessage) -> Result<String, BackendError> {
        let id = {
            let mut collection = self
                .collection
                .lock()
                .map_err(|_| BackendError::Internal("message store lock poisoned".into()))?;
            let created_at = next_timestamp(collection.last_timestamp);
            collection.last_timestamp = Some(created_at);
            collection.next_id += 1;
            let id = format!("local-{:06}", collection.next_id);
            collection.messages.push(Message {
                id: id.clone(),
                user: message.user,
                uid: message.uid,
                photo_url: message.photo_url,
                body: message.body,
                created_at,
            });
            id
        };
        self.version.send_modify(|v| *v += 1);
        debug!("Stored message {}", id);
        Ok(id)
    }
}
