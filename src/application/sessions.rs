use std::sync::Arc;

use sha2::{Digest, Sha256};
use storyloft_api_types::TokenResponse;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::repos::{NewSessionParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::moderation::Viewer;
use crate::domain::types::{SessionKind, UserRole};

const TOKEN_PREFIX: &str = "sl";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing session token")]
    Missing,
    #[error("invalid session token")]
    Invalid,
    #[error("expired session token")]
    Expired,
    #[error("revoked session token")]
    Revoked,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Lifetimes applied to newly minted tokens.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(30),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: UserRole,
    pub anonymous_name: String,
    pub session_id: Uuid,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.user_id,
            role: self.role,
        }
    }

    /// Label written to the audit log.
    pub fn actor(&self) -> String {
        format!("user:{}", self.user_id)
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: OffsetDateTime,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            access_expires_at: pair.access_expires_at,
        }
    }
}

#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionsRepo>,
    users: Arc<dyn UsersRepo>,
    policy: SessionPolicy,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionsRepo>,
        users: Arc<dyn UsersRepo>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            sessions,
            users,
            policy,
        }
    }

    pub async fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, RepoError> {
        let now = OffsetDateTime::now_utc();
        let (access_token, access) = self
            .mint(user_id, SessionKind::Access, now + self.policy.access_ttl)
            .await?;
        let (refresh_token, _) = self
            .mint(user_id, SessionKind::Refresh, now + self.policy.refresh_ttl)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at: access.expires_at,
        })
    }

    /// Resolves a bearer token to the caller it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let now = OffsetDateTime::now_utc();
        let record = self.verify(token, SessionKind::Access, now).await?;
        let user = self
            .users
            .find_user(record.user_id)
            .await?
            .ok_or(AuthError::Invalid)?;

        let session_id = record.id;
        let repo = self.sessions.clone();
        tokio::spawn(async move {
            if let Err(err) = repo.touch_session(session_id, now).await {
                debug!(target = "storyloft::application::sessions", error = %err, "last_used update failed");
            }
        });

        Ok(principal(&user, session_id))
    }

    /// Spends a refresh token and returns a fresh pair. A refresh token is
    /// good for exactly one rotation.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = OffsetDateTime::now_utc();
        let record = self.verify(refresh_token, SessionKind::Refresh, now).await?;
        if !self.sessions.revoke_session(record.id, now).await? {
            warn!(
                target = "storyloft::application::sessions",
                user_id = %record.user_id,
                "refresh token reused after rotation"
            );
            return Err(AuthError::Revoked);
        }
        Ok(self.issue_pair(record.user_id).await?)
    }

    /// Revokes the access session and, when given, the caller's refresh token.
    pub async fn logout(
        &self,
        principal: &Principal,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let now = OffsetDateTime::now_utc();
        self.sessions
            .revoke_session(principal.session_id, now)
            .await?;

        if let Some(token) = refresh_token {
            let record = self.verify(token, SessionKind::Refresh, now).await?;
            if record.user_id != principal.user_id {
                return Err(AuthError::Invalid);
            }
            self.sessions.revoke_session(record.id, now).await?;
        }
        Ok(())
    }

    async fn mint(
        &self,
        user_id: Uuid,
        kind: SessionKind,
        expires_at: OffsetDateTime,
    ) -> Result<(String, SessionRecord), RepoError> {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let record = self
            .sessions
            .create_session(NewSessionParams {
                user_id,
                kind,
                prefix,
                hashed_secret: hash_secret(&secret),
                expires_at,
            })
            .await?;
        Ok((token, record))
    }

    async fn verify(
        &self,
        token: &str,
        expected: SessionKind,
        now: OffsetDateTime,
    ) -> Result<SessionRecord, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::Missing);
        }
        let parsed = parse_token(token).ok_or(AuthError::Invalid)?;
        let record = self
            .sessions
            .find_by_prefix(parsed.prefix)
            .await?
            .ok_or(AuthError::Invalid)?;

        if record.kind != expected {
            return Err(AuthError::Invalid);
        }
        if record.hashed_secret.ct_eq(&hash_secret(parsed.secret)).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }
        if let Some(revoked_at) = record.revoked_at
            && revoked_at <= now
        {
            return Err(AuthError::Revoked);
        }
        if record.expires_at <= now {
            return Err(AuthError::Expired);
        }
        Ok(record)
    }
}

pub(crate) fn principal(user: &UserRecord, session_id: Uuid) -> Principal {
    Principal {
        user_id: user.id,
        role: user.role,
        anonymous_name: user.anonymous_name.clone(),
        session_id,
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ParsedToken<'a> {
    prefix: &'a str,
    secret: &'a str,
}

fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
    let mut parts = token.trim().splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken { prefix, secret })
}
