//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.chitchat/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use clap::ValueEnum;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Backend;
use crate::backend::firebase::FirebaseSettings;
use crate::core::model::Session;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChitchatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub backend: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FirebaseConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub oauth_base_url: Option<String>,
    pub identity_base_url: Option<String>,
    pub secure_token_base_url: Option<String>,
    pub firestore_base_url: Option<String>,
}

/// Profile signed in by the offline backend.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MemoryConfig {
    pub display_name: Option<String>,
    pub uid: Option<String>,
    pub photo_url: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_MEMORY_DISPLAY_NAME: &str = "Local User";
pub const DEFAULT_MEMORY_UID: &str = "local-user";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend: Backend,
    pub firebase: FirebaseSettings,
    pub memory_profile: Session,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.chitchat/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".chitchat").join("config.toml"))
}

/// Load config from `~/.chitchat/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `ChitchatConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<ChitchatConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(ChitchatConfig::default());
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<ChitchatConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(ChitchatConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ChitchatConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config.general);
    Ok(config)
}

const DEFAULT_CONFIG: &str = r#"# chitchat configuration
# Every setting is optional. Override order: defaults, this file, env vars, CLI flags.

# [general]
# backend = "firebase"               # "firebase" or "memory"

# [firebase]
# api_key = "AIza..."                # Or set FIREBASE_API_KEY
# project_id = "my-chat"             # Or set FIREBASE_PROJECT_ID
# oauth_client_id = "...apps.googleusercontent.com"   # Or GOOGLE_OAUTH_CLIENT_ID
# oauth_client_secret = "..."        # Or GOOGLE_OAUTH_CLIENT_SECRET
# poll_interval_ms = 2000

# [memory]
# display_name = "Local User"
# uid = "local-user"
# photo_url = "https://example.com/me.png"
"#;

/// Writes the commented-out default config. Failures are logged, not fatal.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_backend` is the `--backend` flag (None = not specified).
pub fn resolve(config: &ChitchatConfig, cli_backend: Option<Backend>) -> ResolvedConfig {
    resolve_with_env(config, cli_backend, |key| std::env::var(key).ok())
}

fn resolve_with_env(
    config: &ChitchatConfig,
    cli_backend: Option<Backend>,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Backend: CLI → env → config → default
    let backend = cli_backend
        .or_else(|| env("CHITCHAT_BACKEND").and_then(|s| parse_backend(&s)))
        .or_else(|| config.general.backend.as_deref().and_then(parse_backend))
        .unwrap_or_default();

    let fb = &config.firebase;
    let pick = |var: &str, file: &Option<String>| {
        env(var).or_else(|| file.clone()).unwrap_or_default()
    };

    let mut firebase = FirebaseSettings::new(
        pick("FIREBASE_API_KEY", &fb.api_key),
        pick("FIREBASE_PROJECT_ID", &fb.project_id),
        pick("GOOGLE_OAUTH_CLIENT_ID", &fb.oauth_client_id),
        pick("GOOGLE_OAUTH_CLIENT_SECRET", &fb.oauth_client_secret),
    );
    if let Some(ms) = fb.poll_interval_ms {
        firebase.poll_interval = Duration::from_millis(ms.max(100));
    }
    if let Some(url) = &fb.oauth_base_url {
        firebase.oauth_base_url = url.clone();
    }
    if let Some(url) = &fb.identity_base_url {
        firebase.identity_base_url = url.clone();
    }
    if let Some(url) = &fb.secure_token_base_url {
        firebase.secure_token_base_url = url.clone();
    }
    if let Some(url) = &fb.firestore_base_url {
        firebase.firestore_base_url = url.clone();
    }

    let memory_profile = Session {
        display_name: config
            .memory
            .display_name
            .clone()
            .unwrap_or_else(|| DEFAULT_MEMORY_DISPLAY_NAME.to_string()),
        uid: config
            .memory
            .uid
            .clone()
            .unwrap_or_else(|| DEFAULT_MEMORY_UID.to_string()),
        photo_url: config.memory.photo_url.clone(),
    };

    ResolvedConfig {
        backend,
        firebase,
        memory_profile,
    }
}

fn parse_backend(name: &str) -> Option<Backend> {
    match Backend::from_str(name, true) {
        Ok(backend) => Some(backend),
        Err(_) => {
            warn!("Unknown backend '{}', ignoring", name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&ChitchatConfig::default(), None, no_env);
        assert_eq!(resolved.backend, Backend::Firebase);
        assert_eq!(resolved.firebase.poll_interval, Duration::from_millis(2000));
        assert!(resolved.firebase.api_key.is_empty());
        assert_eq!(resolved.memory_profile.uid, DEFAULT_MEMORY_UID);
        assert_eq!(resolved.memory_profile.photo_url, None);
    }

    #[test]
    fn test_toml_values_fill_settings() {
        let toml_str = r#"
[general]
backend = "memory"

[firebase]
api_key = "key-1"
project_id = "chat-proj"
oauth_client_id = "client.apps.googleusercontent.com"
poll_interval_ms = 500
firestore_base_url = "http://localhost:8080/v1"

[memory]
display_name = "Ada"
uid = "ada"
"#;
        let config: ChitchatConfig = toml::from_str(toml_str).unwrap();
        let resolved = resolve_with_env(&config, None, no_env);
        assert_eq!(resolved.backend, Backend::Memory);
        assert_eq!(resolved.firebase.api_key, "key-1");
        assert_eq!(resolved.firebase.project_id, "chat-proj");
        assert_eq!(resolved.firebase.poll_interval, Duration::from_millis(500));
        assert_eq!(resolved.firebase.firestore_base_url, "http://localhost:8080/v1");
        assert_eq!(
            resolved.firebase.identity_base_url,
            crate::backend::firebase::DEFAULT_IDENTITY_BASE_URL
        );
        assert_eq!(resolved.memory_profile.display_name, "Ada");
    }

    #[test]
    fn test_env_beats_file_and_cli_beats_env() {
        let config = ChitchatConfig {
            general: GeneralConfig {
                backend: Some("firebase".into()),
            },
            firebase: FirebaseConfig {
                api_key: Some("from-file".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let env: HashMap<&str, &str> =
            HashMap::from([("FIREBASE_API_KEY", "from-env"), ("CHITCHAT_BACKEND", "memory")]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let resolved = resolve_with_env(&config, None, lookup);
        assert_eq!(resolved.firebase.api_key, "from-env");
        assert_eq!(resolved.backend, Backend::Memory);

        let resolved = resolve_with_env(&config, Some(Backend::Firebase), lookup);
        assert_eq!(resolved.backend, Backend::Firebase);
    }

    #[test]
    fn test_unknown_backend_falls_back() {
        let config = ChitchatConfig {
            general: GeneralConfig {
                backend: Some("carrier-pigeon".into()),
            },
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, None, no_env);
        assert_eq!(resolved.backend, Backend::Firebase);
    }

    #[test]
    fn test_sparse_toml_parses() {
        let config: ChitchatConfig = toml::from_str("[memory]\nuid = \"x\"\n").unwrap();
        assert_eq!(config.memory.uid.as_deref(), Some("x"));
        assert!(config.general.backend.is_none());
        assert!(config.firebase.api_key.is_none());
    }

    #[test]
    fn test_generated_default_is_valid_toml() {
        let path = std::env::temp_dir()
            .join(format!("chitchat-config-{}", uuid::Uuid::new_v4()))
            .join("config.toml");
        let config = load_config_from(&path).unwrap();
        assert!(config.general.backend.is_none());
        assert!(path.exists());
        // Second load reads the generated (all-commented) file
        let reloaded = load_config_from(&path).unwrap();
        assert!(reloaded.firebase.project_id.is_none());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let path = std::env::temp_dir()
            .join(format!("chitchat-config-{}", uuid::Uuid::new_v4()))
            .join("config.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[general\nbackend = ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
