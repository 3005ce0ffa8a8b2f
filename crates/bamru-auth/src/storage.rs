use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::AuthError;

/// Seconds before expiry at which a token is treated as stale.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Google OAuth token as persisted in the token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    /// Absent when Google didn't grant offline access.
    pub refresh_token: Option<String>,

    /// Unix seconds.
    pub expires_at: i64,

    #[serde(default)]
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Expired, or close enough that it may expire mid-run.
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - REFRESH_MARGIN_SECS
    }
}

/// File-backed cache for the Google token, kept between runs.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the cached token.
    ///
    /// A missing or unreadable file yields `Ok(None)` so the caller can fall
    /// back to interactive authorization.
    pub fn load(&self) -> Result<Option<TokenSet>, AuthError> {
        if !self.path.exists() {
            tracing::debug!("No token file at {}", self.path.display());
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).map_err(|e| {
            AuthError::TokenStorage(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        match serde_json::from_str::<TokenSet>(&json) {
            Ok(token_set) => {
                tracing::debug!("Loaded token from {}", self.path.display());
                Ok(Some(token_set))
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable token file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Write the token, creating parent directories as needed.
    pub fn save(&self, token_set: &TokenSet) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::TokenStorage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(token_set)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to serialize token: {}", e)))?;

        fs::write(&self.path, json).map_err(|e| {
            AuthError::TokenStorage(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        // Owner-only, the file holds a refresh token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                AuthError::TokenStorage(format!(
                    "Failed to set permissions on {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }

        tracing::info!("Stored Google token at {}", self.path.display());
        Ok(())
    }
}
