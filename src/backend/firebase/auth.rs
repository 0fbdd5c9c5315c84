//! Firebase Authentication with a Google identity.
//!
//! A terminal has no popup, so the interactive step uses the Google OAuth
//! device flow: the viewer opens a URL on any device and types a short
//! code. The resulting Google ID token is exchanged for a Firebase session
//! through `accounts:signInWithIdp`.
//!
//! Flow:
//! 1. POST `/device/code` → user code + verification URL (published as a challenge)
//! 2. POST `/token` until the viewer confirms (`authorization_pending`, `slow_down`)
//! 3. POST `/accounts:signInWithIdp` with `providerId=google.com`
//! 4. Keep the Firebase ID token fresh through `securetoken` `/token`

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

use crate::backend::firebase::credentials::{self, SavedCredentials};
use crate::backend::firebase::{FirebaseSettings, api_error, error_message};
use crate::backend::provider::{BackendError, IdentityProvider, SignInChallenge};
use crate::core::model::Session;
use crate::core::state::AuthState;

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const OAUTH_SCOPE: &str = "openid email profile";
/// Refresh this long before the ID token actually expires.
const EXPIRY_MARGIN: TimeDelta = TimeDelta::seconds(60);
/// Extra wait the device flow asks for on `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

// ============================================================================
// REST Types
// ============================================================================

#[derive(Deserialize, Debug)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_uri")]
    verification_url: String,
    expires_in: u64,
    #[serde(default = "default_interval")]
    interval: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Deserialize, Debug)]
struct GoogleTokenResponse {
    id_token: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_secure_token: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    /// Seconds, encoded as a string.
    expires_in: String,
}

#[derive(Deserialize, Debug)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

// ============================================================================
// Provider
// ============================================================================

struct Tokens {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Tokens {
    fn new(id_token: String, refresh_token: String, expires_in: &str) -> Self {
        let seconds = expires_in.parse::<i64>().unwrap_or(3600);
        Self {
            id_token,
            refresh_token,
            expires_at: Utc::now() + TimeDelta::seconds(seconds),
        }
    }

    fn is_fresh(&self) -> bool {
        Utc::now() + EXPIRY_MARGIN < self.expires_at
    }
}

/// Firebase Authentication identity provider (Google sign-in).
pub struct FirebaseAuth {
    settings: FirebaseSettings,
    client: reqwest::Client,
    state: watch::Sender<AuthState>,
    tokens: Mutex<Option<Tokens>>,
    /// Where the session survives restarts. `None` keeps it in memory only.
    credentials_path: Option<PathBuf>,
}

impl FirebaseAuth {
    pub fn new(settings: FirebaseSettings, credentials_path: Option<PathBuf>) -> Self {
        let (state, _) = watch::channel(AuthState::Unresolved);
        Self {
            settings,
            client: reqwest::Client::new(),
            state,
            tokens: Mutex::new(None),
            credentials_path,
        }
    }

    /// A valid Firebase ID token for the signed-in viewer, refreshed if
    /// it is about to expire. A rejected refresh ends the session.
    pub async fn id_token(&self) -> Result<String, BackendError> {
        let mut tokens = self.tokens.lock().await;
        let Some(current) = tokens.as_ref() else {
            return Err(BackendError::Unauthenticated);
        };
        if current.is_fresh() {
            return Ok(current.id_token.clone());
        }

        debug!("ID token expiring, refreshing");
        match self.refresh(&current.refresh_token).await {
            Ok(fresh) => {
                let id_token = fresh.id_token.clone();
                *tokens = Some(fresh);
                Ok(id_token)
            }
            Err(BackendError::Api { status, message }) if status == 400 || status == 401 => {
                warn!("Refresh rejected ({}), ending session", message);
                *tokens = None;
                self.forget_credentials();
                self.state.send_replace(AuthState::Anonymous);
                Err(BackendError::Unauthenticated)
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens, BackendError> {
        let response = self
            .client
            .post(format!(
                "{}/token?key={}",
                self.settings.secure_token_base_url, self.settings.api_key
            ))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error("securetoken", response).await);
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(Tokens::new(body.id_token, body.refresh_token, &body.expires_in))
    }

    async fn request_device_code(&self) -> Result<DeviceCodeResponse, BackendError> {
        let response = self
            .client
            .post(format!("{}/device/code", self.settings.oauth_base_url))
            .form(&[
                ("client_id", self.settings.oauth_client_id.as_str()),
                ("scope", OAUTH_SCOPE),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error("oauth device", response).await);
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Polls the token endpoint until the viewer confirms, declines, or the
    /// code expires. Returns the Google ID token.
    async fn await_confirmation(&self, device: &DeviceCodeResponse) -> Result<String, BackendError> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval = Duration::from_secs(device.interval);

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() >= deadline {
                return Err(BackendError::SignInExpired);
            }

            let response = self
                .client
                .post(format!("{}/token", self.settings.oauth_base_url))
                .form(&[
                    ("client_id", self.settings.oauth_client_id.as_str()),
                    ("client_secret", self.settings.oauth_client_secret.as_str()),
                    ("device_code", device.device_code.as_str()),
                    ("grant_type", DEVICE_GRANT_TYPE),
                ])
                .send()
                .await?;

            if response.status().is_success() {
                let body: GoogleTokenResponse = response
                    .json()
                    .await
                    .map_err(|e| BackendError::Parse(e.to_string()))?;
                return Ok(body.id_token);
            }

            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            match error_message(&body).as_str() {
                "authorization_pending" => debug!("Waiting for viewer to confirm sign-in"),
                "slow_down" => {
                    interval += SLOW_DOWN_STEP;
                    debug!("Device flow asked to slow down, interval now {:?}", interval);
                }
                "access_denied" => return Err(BackendError::SignInDenied),
                "expired_token" => return Err(BackendError::SignInExpired),
                other => {
                    return Err(BackendError::Api {
                        status,
                        message: other.to_string(),
                    });
                }
            }
        }
    }

    async fn exchange_google_token(
        &self,
        google_id_token: &str,
    ) -> Result<SignInWithIdpResponse, BackendError> {
        let request = SignInWithIdpRequest {
            post_body: format!("id_token={google_id_token}&providerId=google.com"),
            request_uri: "http://localhost",
            return_secure_token: true,
        };

        let response = self
            .client
            .post(format!(
                "{}/accounts:signInWithIdp?key={}",
                self.settings.identity_base_url, self.settings.api_key
            ))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error("identitytoolkit", response).await);
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    fn remember_credentials(&self, saved: &SavedCredentials) {
        if let Some(path) = &self.credentials_path
            && let Err(e) = credentials::save(path, saved)
        {
            warn!("Failed to save credentials: {}", e);
        }
    }

    fn forget_credentials(&self) {
        if let Some(path) = &self.credentials_path
            && let Err(e) = credentials::delete(path)
        {
            warn!("Failed to delete credentials: {}", e);
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    fn name(&self) -> &str {
        "firebase"
    }

    fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    async fn resolve(&self) -> Result<(), BackendError> {
        let saved = match &self.credentials_path {
            Some(path) => credentials::load(path).unwrap_or_else(|e| {
                warn!("Ignoring unreadable credentials at {}: {}", path.display(), e);
                None
            }),
            None => None,
        };

        let Some(saved) = saved else {
            info!("No saved session");
            self.state.send_replace(AuthState::Anonymous);
            return Ok(());
        };

        match self.refresh(&saved.refresh_token).await {
            Ok(tokens) => {
                info!("Restored session for {}", saved.uid);
                let saved = SavedCredentials {
                    refresh_token: tokens.refresh_token.clone(),
                    ..saved
                };
                *self.tokens.lock().await = Some(tokens);
                self.remember_credentials(&saved);
                self.state
                    .send_replace(AuthState::Authenticated(saved.session()));
                Ok(())
            }
            Err(e) => {
                if matches!(e, BackendError::Api { status: 400 | 401, .. }) {
                    self.forget_credentials();
                }
                warn!("Could not restore session: {}", e);
                self.state.send_replace(AuthState::Anonymous);
                Err(e)
            }
        }
    }

    async fn sign_in(
        &self,
        challenges: UnboundedSender<SignInChallenge>,
    ) -> Result<Session, BackendError> {
        self.settings.validate()?;

        let device = self.request_device_code().await?;
        info!("Device sign-in started, code expires in {}s", device.expires_in);
        challenges
            .send(SignInChallenge {
                verification_url: device.verification_url.clone(),
                user_code: device.user_code.clone(),
                expires_in: device.expires_in,
            })
            .map_err(|_| BackendError::ChannelClosed)?;

        let google_id_token = self.await_confirmation(&device).await?;
        let account = self.exchange_google_token(&google_id_token).await?;

        let session = Session {
            display_name: account
                .display_name
                .filter(|n| !n.is_empty())
                .or(account.email)
                .unwrap_or_else(|| "Anonymous".to_string()),
            uid: account.local_id,
            photo_url: account.photo_url.filter(|u| !u.is_empty()),
        };
        let tokens = Tokens::new(account.id_token, account.refresh_token, &account.expires_in);

        self.remember_credentials(&SavedCredentials {
            uid: session.uid.clone(),
            display_name: session.display_name.clone(),
            photo_url: session.photo_url.clone(),
            refresh_token: tokens.refresh_token.clone(),
        });
        *self.tokens.lock().await = Some(tokens);

        info!("Signed in as {}", session.uid);
        self.state
            .send_replace(AuthState::Authenticated(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        *self.tokens.lock().await = None;
        self.forget_credentials();
        self.state.send_replace(AuthState::Anonymous);
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_string_expiry() {
        let tokens = Tokens::new("id".into(), "refresh".into(), "3600");
        assert!(tokens.is_fresh());
        let soon = Tokens::new("id".into(), "refresh".into(), "30");
        // Inside the refresh margin already
        assert!(!soon.is_fresh());
    }

    #[test]
    fn device_code_accepts_both_url_spellings() {
        let google = r#"{"device_code":"d","user_code":"U","verification_url":"https://www.google.com/device","expires_in":1800,"interval":5}"#;
        let rfc = r#"{"device_code":"d","user_code":"U","verification_uri":"https://example.com/device","expires_in":600}"#;
        let a: DeviceCodeResponse = serde_json::from_str(google).unwrap();
        let b: DeviceCodeResponse = serde_json::from_str(rfc).unwrap();
        assert_eq!(a.verification_url, "https://www.google.com/device");
        assert_eq!(b.verification_url, "https://example.com/device");
        assert_eq!(b.interval, 5);
    }

    #[test]
    fn idp_request_uses_google_provider() {
        let request = SignInWithIdpRequest {
            post_body: "id_token=abc&providerId=google.com".into(),
            request_uri: "http://localhost",
            return_secure_token: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["postBody"], "id_token=abc&providerId=google.com");
        assert_eq!(json["returnSecureToken"], true);
    }

    #[tokio::test]
    async fn id_token_without_session_is_unauthenticated() {
        let auth = FirebaseAuth::new(FirebaseSettings::new("k", "p", "c", "s"), None);
        assert_eq!(auth.id_token().await, Err(BackendError::Unauthenticated));
    }

    #[tokio::test]
    async fn sign_out_resolves_to_anonymous() {
        let auth = FirebaseAuth::new(FirebaseSettings::new("k", "p", "c", "s"), None);
        auth.sign_out().await.unwrap();
        assert_eq!(*auth.watch().borrow(), AuthState::Anonymous);
    }
}
