use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ApiError;

/// Credential owned by a logged-in user, passed into every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: String,
    email: String,
    logged_in_at: DateTime<Utc>,
}

impl Session {
    /// Start a session from a freshly issued access token.
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            email: email.into(),
            logged_in_at: Utc::now(),
        }
    }

    /// Bearer token, or [`ApiError::MissingToken`] when it is blank.
    pub fn bearer(&self) -> Result<&str, ApiError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(ApiError::MissingToken);
        }
        Ok(token)
    }

    /// Email used to log in.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// When the token was issued.
    pub fn logged_in_at(&self) -> DateTime<Utc> {
        self.logged_in_at
    }
}

/// Persists the session across restarts until logout.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the given JSON file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted session, if any.
    ///
    /// A corrupt file is treated as logged out.
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "Discarding unreadable session file");
                Ok(None)
            }
        }
    }

    /// Persist the session, replacing any previous one.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized =
            serde_json::to_string_pretty(session).context("failed to serialize session")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(email = %session.email, "Session stored");
        Ok(())
    }

    /// Forget the persisted session.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
            info!("Session cleared");
        }
        Ok(())
    }
}
