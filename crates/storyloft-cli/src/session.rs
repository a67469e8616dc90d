//! Persistent client session.
//!
//! The session is an explicit object owned by [`crate::client::ApiClient`]:
//! restored from the session file on start, replaced after every refresh, and
//! removed on logout or when a refresh fails.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storyloft_api_types::TokenResponse;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
}

impl From<TokenResponse> for Session {
    fn from(tokens: TokenResponse) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
        }
    }
}

#[derive(Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// A store that never touches the filesystem.
    #[must_use]
    pub fn in_memory(session: Option<Session>) -> Self {
        Self {
            path: None,
            current: RwLock::new(session),
        }
    }

    /// Restores the session persisted at `path`, if any.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let current = match tokio::fs::read(&path).await {
            Ok(bytes) => Some(serde_json::from_slice::<Session>(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ClientError::SessionFile {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        Ok(Self {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub async fn replace(&self, session: Session) -> Result<(), ClientError> {
        self.persist(Some(&session)).await?;
        *self.current.write().await = Some(session);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        self.persist(None).await?;
        *self.current.write().await = None;
        Ok(())
    }

    async fn persist(&self, session: Option<&Session>) -> Result<(), ClientError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file_error = |source| ClientError::SessionFile {
            path: path.display().to_string(),
            source,
        };

        match session {
            Some(session) => {
                let bytes = serde_json::to_vec_pretty(session)?;
                tokio::fs::write(path, bytes).await.map_err(file_error)
            }
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(file_error(err)),
            },
        }
    }
}
