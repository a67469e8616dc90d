use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NewUserParams, RegisteredUser, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::types::UserRole;

use super::{PostgresRepositories, map_sqlx_error};

pub(super) const USER_COLUMNS: &str =
    "u.id, u.username, u.anonymous_name, u.role, u.referral_code, u.referral_count, u.referred_by, u.created_at";

#[derive(sqlx::FromRow)]
pub(super) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub anonymous_name: String,
    pub role: UserRole,
    pub referral_code: String,
    pub referral_count: i64,
    pub referred_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            anonymous_name: row.anonymous_name,
            role: row.role,
            referral_code: row.referral_code,
            referral_count: row.referral_count,
            referred_by: row.referred_by,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn register_user(&self, params: NewUserParams) -> Result<RegisteredUser, RepoError> {
        let mut tx = self.begin().await?;

        // Credit and insert share the transaction; a failed insert rolls the credit back.
        let referrer = match params.referred_with.as_deref() {
            Some(code) => sqlx::query_scalar::<_, Uuid>(
                "UPDATE users SET referral_count = referral_count + 1 \
                 WHERE referral_code = $1 RETURNING id",
            )
            .bind(code)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?,
            None => None,
        };

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users AS u (id, username, anonymous_name, role, referral_code, referred_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&params.username)
        .bind(&params.anonymous_name)
        .bind(params.role)
        .bind(&params.referral_code)
        .bind(referrer)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(RegisteredUser {
            user: row.into(),
            referrer,
        })
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.id, UserRecord::from(row)))
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE lower(u.username) = lower($1)"
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users AS u SET role = $2 WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }
}
