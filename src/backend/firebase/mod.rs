//! # Firebase Backend
//!
//! Hosted identity and storage over the public REST APIs:
//!
//! ```text
//! FirebaseAuth ── Google OAuth device flow ──▶ oauth2.googleapis.com
//!              ── signInWithIdp / refresh ───▶ identitytoolkit / securetoken
//!       │
//!       │ id_token()
//!       ▼
//! FirestoreStore ── runQuery (live feed) ────▶ firestore.googleapis.com
//!                ── commit (insert) ─────────▶
//! ```
//!
//! Every base URL is configurable so integration tests can point the whole
//! backend at a mock server.

mod auth;
pub mod credentials;
mod firestore;

use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::backend::BackendError;

pub use auth::FirebaseAuth;
pub use firestore::FirestoreStore;

pub const DEFAULT_OAUTH_BASE_URL: &str = "https://oauth2.googleapis.com";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Connection settings for one Firebase project.
#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub api_key: String,
    pub project_id: String,
    /// Google OAuth client registered for "TVs and Limited Input devices".
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_base_url: String,
    pub identity_base_url: String,
    pub secure_token_base_url: String,
    pub firestore_base_url: String,
    /// How often the live query re-reads the feed.
    pub poll_interval: Duration,
}

impl FirebaseSettings {
    /// Settings against the production endpoints.
    pub fn new(
        api_key: impl Into<String>,
        project_id: impl Into<String>,
        oauth_client_id: impl Into<String>,
        oauth_client_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            oauth_client_id: oauth_client_id.into(),
            oauth_client_secret: oauth_client_secret.into(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            secure_token_base_url: DEFAULT_SECURE_TOKEN_BASE_URL.to_string(),
            firestore_base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Points every endpoint at one base URL (mock servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.oauth_base_url = base_url.to_string();
        self.identity_base_url = base_url.to_string();
        self.secure_token_base_url = base_url.to_string();
        self.firestore_base_url = base_url.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        let missing: Vec<&str> = [
            ("api_key", &self.api_key),
            ("project_id", &self.project_id),
            ("oauth_client_id", &self.oauth_client_id),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BackendError::Config(format!(
                "missing firebase settings: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Google APIs report errors either as `{"error": {"message": ..}}`
/// (Firebase, Firestore) or `{"error": "code"}` (OAuth).
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { error: ErrorDetail },
    Code { error: String },
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    message: String,
}

/// Extracts the short error message from a Google API error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Detailed { error }) => error.message,
        Ok(ErrorBody::Code { error }) => error,
        Err(_) => body.trim().to_string(),
    }
}

/// Turns a non-success response into `BackendError::Api`.
async fn api_error(service: &str, response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    warn!("{} API error: {} - {}", service, status, body);
    BackendError::Api {
        status,
        message: error_message(&body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_reads_firebase_shape() {
        let body = r#"{"error":{"code":400,"message":"INVALID_REFRESH_TOKEN","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "INVALID_REFRESH_TOKEN");
    }

    #[test]
    fn error_message_reads_oauth_shape() {
        let body = r#"{"error":"authorization_pending","error_description":"Precondition Required"}"#;
        assert_eq!(error_message(body), "authorization_pending");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn validate_lists_missing_fields() {
        let settings = FirebaseSettings::new("", "proj", "", "");
        match settings.validate() {
            Err(BackendError::Config(msg)) => {
                assert!(msg.contains("api_key"));
                assert!(msg.contains("oauth_client_id"));
                assert!(!msg.contains("project_id"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn with_base_url_overrides_everything() {
        let settings = FirebaseSettings::new("k", "p", "c", "s").with_base_url("http://127.0.0.1:9");
        assert_eq!(settings.oauth_base_url, "http://127.0.0.1:9");
        assert_eq!(settings.firestore_base_url, "http://127.0.0.1:9");
        assert!(settings.validate().is_ok());
    }
}
