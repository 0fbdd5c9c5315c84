//! Cloud Firestore message store over the REST API.
//!
//! - Live query: `documents:runQuery` ordered by `createdAt` descending with
//!   the window limit, reversed to ascending. The query is re-run on a timer
//!   and right after every local insert; a snapshot is delivered only when
//!   the result set differs from the previous one.
//! - Insert: `documents:commit` with a `REQUEST_TIME` transform on
//!   `createdAt`, so the timestamp always comes from the server.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

use crate::backend::firebase::{FirebaseAuth, FirebaseSettings, api_error};
use crate::backend::provider::{BackendError, DocumentStore, FeedEvent, Subscription, deliver};
use crate::core::feed::{FeedQuery, window};
use crate::core::model::{Message, NewMessage};

// ============================================================================
// REST Types
// ============================================================================

/// A Firestore typed value. Only the kinds chitchat writes are read back;
/// anything else decodes as "absent".
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp_value: Option<String>,
}

impl Value {
    fn string(s: &str) -> Self {
        Self {
            string_value: Some(s.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

/// One element of the `runQuery` response array. Elements without a
/// document only carry read metadata.
#[derive(Deserialize, Debug)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<WriteResult>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WriteResult {
    #[serde(default)]
    transform_results: Vec<Value>,
}

// ============================================================================
// Translation Layer
// ============================================================================

/// Firestore field map for a new message. `createdAt` is not here: it is
/// filled in by the server transform. A missing photo is omitted entirely.
fn message_fields(message: &NewMessage) -> HashMap<&'static str, Value> {
    let mut fields = HashMap::from([
        ("user", Value::string(&message.user)),
        ("body", Value::string(&message.body)),
        ("uid", Value::string(&message.uid)),
    ]);
    if let Some(photo) = &message.photo_url {
        fields.insert("photoURL", Value::string(photo));
    }
    fields
}

fn string_field(fields: &HashMap<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(|v| v.string_value.clone())
}

/// Converts a stored document into a `Message`. Documents still missing a
/// server timestamp are skipped; other missing fields read as empty.
fn document_to_message(doc: Document) -> Option<Message> {
    let id = doc.name.rsplit('/').next()?.to_string();
    let created_at = doc
        .fields
        .get("createdAt")
        .and_then(|v| v.timestamp_value.as_deref())
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    let Some(created_at) = created_at else {
        debug!("Skipping document {} without createdAt", id);
        return None;
    };
    Some(Message {
        id,
        user: string_field(&doc.fields, "user").unwrap_or_default(),
        uid: string_field(&doc.fields, "uid").unwrap_or_default(),
        photo_url: string_field(&doc.fields, "photoURL").filter(|u| !u.is_empty()),
        body: string_field(&doc.fields, "body").unwrap_or_default(),
        created_at,
    })
}

fn run_query_body(query: &FeedQuery) -> serde_json::Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": query.collection }],
            "orderBy": [{
                "field": { "fieldPath": "createdAt" },
                "direction": "DESCENDING"
            }],
            "limit": query.limit
        }
    })
}

// ============================================================================
// Store Implementation
// ============================================================================

struct Inner {
    settings: FirebaseSettings,
    client: reqwest::Client,
    auth: Arc<FirebaseAuth>,
    /// Bumped after every local write. A bump that lands while a live query
    /// is mid-request stays pending until the query next waits.
    wrote: watch::Sender<u64>,
}

impl Inner {
    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.settings.firestore_base_url, self.settings.project_id
        )
    }

    async fn run_query(&self, query: &FeedQuery) -> Result<Vec<Message>, BackendError> {
        let token = self.auth.id_token().await?;
        let response = self
            .client
            .post(format!("{}:runQuery", self.documents_url()))
            .bearer_auth(token)
            .json(&run_query_body(query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error("firestore runQuery", response).await);
        }

        let items: Vec<RunQueryItem> = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let messages = items
            .into_iter()
            .filter_map(|item| item.document)
            .filter_map(document_to_message);
        Ok(window(messages, query.limit))
    }
}

/// Firestore-backed message store.
pub struct FirestoreStore {
    inner: Arc<Inner>,
}

impl FirestoreStore {
    pub fn new(settings: FirebaseSettings, auth: Arc<FirebaseAuth>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                client: reqwest::Client::new(),
                auth,
                wrote: watch::channel(0).0,
            }),
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn name(&self) -> &str {
        "firestore"
    }

    fn subscribe(&self, query: FeedQuery, sender: UnboundedSender<FeedEvent>) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        let task_active = active.clone();
        let inner = self.inner.clone();
        let mut wrote = inner.wrote.subscribe();

        info!(
            "Live query on '{}' (limit {}, every {:?})",
            query.collection, query.limit, inner.settings.poll_interval
        );

        let task = tokio::spawn(async move {
            let mut last: Option<Vec<Message>> = None;
            loop {
                match inner.run_query(&query).await {
                    Ok(messages) => {
                        if last.as_ref() != Some(&messages) {
                            debug!("Live query changed: {} messages", messages.len());
                            if !deliver(&task_active, &sender, FeedEvent::Snapshot(messages.clone())) {
                                return;
                            }
                            last = Some(messages);
                        }
                    }
                    Err(e) => {
                        // No retry: the query ends here
                        warn!("Live query failed: {}", e);
                        deliver(&task_active, &sender, FeedEvent::Failed(e));
                        return;
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(inner.settings.poll_interval) => {}
                    Ok(()) = wrote.changed() => debug!("Local write, re-running live query"),
                }
            }
        });

        Subscription::new(active, vec![task.abort_handle()])
    }

    async fn insert(&self, message: NewMessage) -> Result<String, BackendError> {
        let inner = &self.inner;
        let token = inner.auth.id_token().await?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!(
            "projects/{}/databases/(default)/documents/messages/{}",
            inner.settings.project_id, id
        );

        let body = json!({
            "writes": [{
                "update": { "name": name, "fields": message_fields(&message) },
                "updateTransforms": [{
                    "fieldPath": "createdAt",
                    "setToServerValue": "REQUEST_TIME"
                }],
                "currentDocument": { "exists": false }
            }]
        });

        let response = inner
            .client
            .post(format!("{}:commit", inner.documents_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error("firestore commit", response).await);
        }

        let commit: CommitResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        let server_time = commit
            .write_results
            .first()
            .and_then(|w| w.transform_results.first())
            .and_then(|v| v.timestamp_value.clone());
        info!("Inserted message {} (createdAt {:?})", id, server_time);

        inner.wrote.send_modify(|v| *v += 1);
        Ok(id)
    }
}
