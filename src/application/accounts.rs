use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::audit::AuditService;
use crate::application::error::ServiceError;
use crate::application::repos::{NewUserParams, RepoError, UsersRepo};
use crate::application::sessions::{SessionService, TokenPair};
use crate::domain::entities::UserRecord;
use crate::domain::types::UserRole;
use crate::domain::users::{
    generate_anonymous_name, generate_referral_code, normalize_referral_code,
    validate_anonymous_name, validate_desired_code, validate_username,
};

/// Generated codes can collide with existing ones; retry a few times.
const GENERATED_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct RegisterCommand {
    pub username: String,
    pub anonymous_name: Option<String>,
    pub referral_code: Option<String>,
    pub desired_referral_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub user: UserRecord,
    pub tokens: TokenPair,
    pub referral_applied: bool,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: SessionService,
    audit: AuditService,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: SessionService, audit: AuditService) -> Self {
        Self {
            users,
            sessions,
            audit,
        }
    }

    /// Creates the account, credits the referrer in the same store call, and
    /// signs the new user in.
    pub async fn register(&self, cmd: RegisterCommand) -> Result<Registration, ServiceError> {
        let username = validate_username(&cmd.username)?;
        let anonymous_name = match cmd.anonymous_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => validate_anonymous_name(name)?,
            _ => generate_anonymous_name(),
        };
        let desired = match cmd.desired_referral_code.as_deref() {
            Some(code) if !code.trim().is_empty() => Some(validate_desired_code(code)?),
            _ => None,
        };
        let referred_with = cmd
            .referral_code
            .as_deref()
            .map(normalize_referral_code)
            .filter(|code| !code.is_empty());

        let attempts = if desired.is_some() {
            1
        } else {
            GENERATED_CODE_ATTEMPTS
        };

        let mut last_err = None;
        for _ in 0..attempts {
            let referral_code = desired.clone().unwrap_or_else(generate_referral_code);
            let params = NewUserParams {
                username: username.clone(),
                anonymous_name: anonymous_name.clone(),
                role: UserRole::User,
                referral_code,
                referred_with: referred_with.clone(),
            };

            match self.users.register_user(params).await {
                Ok(registered) => {
                    let tokens = self.sessions.issue_pair(registered.user.id).await?;
                    info!(
                        target = "storyloft::application::accounts",
                        user_id = %registered.user.id,
                        referred = registered.referrer.is_some(),
                        "user registered"
                    );
                    return Ok(Registration {
                        user: registered.user,
                        tokens,
                        referral_applied: registered.referrer.is_some(),
                    });
                }
                Err(RepoError::Duplicate { constraint })
                    if constraint.contains("referral_code") =>
                {
                    if desired.is_some() {
                        return Err(ServiceError::conflict("referral code is already taken"));
                    }
                    last_err = Some(ServiceError::conflict("could not allocate a referral code"));
                }
                Err(RepoError::Duplicate { .. }) => {
                    return Err(ServiceError::conflict("username is already taken"));
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(last_err.unwrap_or_else(|| ServiceError::conflict("registration failed")))
    }

    pub async fn me(&self, user_id: Uuid) -> Result<UserRecord, ServiceError> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// Operator command: promotes an existing account to admin.
    pub async fn grant_admin(&self, username: &str, actor: &str) -> Result<UserRecord, ServiceError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        let updated = self.users.set_role(user.id, UserRole::Admin).await?;

        let entity_id = updated.id.to_string();
        self.audit
            .record(
                actor,
                "user.grant_admin",
                "user",
                Some(entity_id.as_str()),
                Some(&updated.username),
            )
            .await?;
        info!(
            target = "storyloft::application::accounts",
            username = %updated.username,
            "admin role granted"
        );
        Ok(updated)
    }

    /// Operator command: mints a session for an existing account.
    pub async fn issue_for_username(&self, username: &str) -> Result<TokenPair, ServiceError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        Ok(self.sessions.issue_pair(user.id).await?)
    }
}
