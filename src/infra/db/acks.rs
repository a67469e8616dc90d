use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{MatureAckRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl MatureAckRepo for PostgresRepositories {
    async fn acknowledge(&self, user_id: Uuid, content_id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO mature_acks (user_id, content_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, content_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(content_id)
        .execute(self.pool())
        .await
        .map_err(|err| match map_sqlx_error(err) {
            RepoError::InvalidInput { .. } => RepoError::NotFound,
            other => other,
        })?;
        Ok(())
    }

    async fn acknowledged_among(
        &self,
        user_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError> {
        if content_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<Uuid> = sqlx::query_scalar(
            "SELECT content_id FROM mature_acks WHERE user_id = $1 AND content_id = ANY($2)",
        )
        .bind(user_id)
        .bind(content_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().collect())
    }
}
