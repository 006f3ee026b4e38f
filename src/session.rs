//! Persisted session for the StyleMuse client
//!
//! The logged-in user record is the only client-side persistent state. It is
//! stored as one JSON document and rewritten whole after every operation
//! that returns an updated user.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use stylemuse_protocol::common::User;

use crate::error::{MuseError, Result};

/// Stored session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session storage manager
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    obfuscation_key: Option<String>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            obfuscation_key: None,
        }
    }

    pub fn with_obfuscation(path: PathBuf, key: impl Into<String>) -> Self {
        Self {
            path,
            obfuscation_key: Some(key.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session. Absence means "not authenticated".
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| MuseError::io_from_error("Read session storage", e))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let decoded = if let Some(key) = &self.obfuscation_key {
            decode_content(&content, key)?
        } else {
            content
        };

        let session = serde_json::from_str(&decoded)
            .map_err(|e| MuseError::internal(format!("Failed to parse session storage: {e}")))?;

        Ok(Some(session))
    }

    /// Persist the full user record, keeping the original login time.
    pub fn save(&self, user: &User) -> Result<()> {
        let created_at = self
            .load()
            .ok()
            .flatten()
            .map(|s| s.created_at)
            .unwrap_or_else(Utc::now);

        let session = StoredSession {
            user: user.clone(),
            created_at,
            updated_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| MuseError::io_from_error("Create storage directory", e))?;
        }

        let content = serde_json::to_string_pretty(&session)?;
        let final_content = if let Some(key) = &self.obfuscation_key {
            encode_content(&content, key)
        } else {
            content
        };

        fs::write(&self.path, final_content)
            .map_err(|e| MuseError::io_from_error("Write session storage", e))?;

        Ok(())
    }

    /// Remove the persisted record (logout).
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| MuseError::io_from_error("Remove session storage", e))?;
        }
        Ok(())
    }
}

fn encode_content(content: &str, key: &str) -> String {
    let key_bytes = key.as_bytes();
    let encoded: Vec<u8> = content
        .as_bytes()
        .iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
        .collect();

    base64::engine::general_purpose::STANDARD.encode(encoded)
}

fn decode_content(encoded_content: &str, key: &str) -> Result<String> {
    let encoded_bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded_content.trim())
        .map_err(|e| MuseError::internal(format!("Failed to decode session storage: {e}")))?;

    let key_bytes = key.as_bytes();
    let decoded: Vec<u8> = encoded_bytes
        .iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
        .collect();

    String::from_utf8(decoded)
        .map_err(|e| MuseError::internal(format!("Failed to decode session storage: {e}")))
}
