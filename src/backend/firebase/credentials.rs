//! # Saved Credentials
//!
//! Keeps the signed-in profile and its refresh token at
//! `~/.chitchat/credentials.json` so a restart does not require signing in
//! again. Writes use atomic rename (write `.tmp`, then `rename()`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::model::Session;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SavedCredentials {
    pub uid: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub refresh_token: String,
}

impl SavedCredentials {
    pub fn session(&self) -> Session {
        Session {
            display_name: self.display_name.clone(),
            uid: self.uid.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

/// Returns `~/.chitchat/credentials.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".chitchat").join("credentials.json"))
}

/// Reads saved credentials. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> io::Result<Option<SavedCredentials>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn save(path: &Path, credentials: &SavedCredentials) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(credentials)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn delete(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
