use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::tidal_rs::types::TokenResponse;

/// Saved OAuth session, stored as a small JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp after which `access_token` is no longer usable.
    pub expiry_time: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no saved session at {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("token response carried no refresh token")]
    NoRefreshToken,
}

/// Validity of the saved session. Classification happens here so the caller
/// decides whether to refresh or re-authenticate; the sync path itself never
/// performs interactive login.
#[derive(Debug, Clone)]
pub enum SessionState {
    Valid(StoredSession),
    Expired(StoredSession),
    Missing,
}

impl StoredSession {
    /// Build a session from a token grant. Refresh grants may omit the refresh
    /// token, in which case the previous one is carried over.
    pub fn from_token(
        token: &TokenResponse,
        previous_refresh_token: Option<&str>,
    ) -> Result<Self, SessionError> {
        let refresh_token = token
            .refresh_token
            .clone()
            .or_else(|| previous_refresh_token.map(str::to_owned))
            .ok_or(SessionError::NoRefreshToken)?;

        Ok(Self {
            token_type: token.token_type.clone(),
            access_token: token.access_token.clone(),
            refresh_token,
            expiry_time: Utc::now().timestamp() + token.expires_in,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        if !path.exists() {
            return Err(SessionError::Missing(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_time <= Utc::now().timestamp()
    }
}

impl SessionState {
    /// Classify the session file. A malformed file counts as missing, since
    /// its tokens are unusable either way; it is logged, not silently eaten.
    pub fn probe(path: &Path) -> SessionState {
        match StoredSession::load(path) {
            Ok(session) if session.is_expired() => SessionState::Expired(session),
            Ok(session) => SessionState::Valid(session),
            Err(SessionError::Missing(_)) => SessionState::Missing,
            Err(error) => {
                tracing::warn!(%error, path = %path.display(), "ignoring unreadable session file");
                SessionState::Missing
            }
        }
    }
}
