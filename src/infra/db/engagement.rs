use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{EngagementRepo, LikeToggled, RepoError, VoteTally};
use crate::domain::engagement::{resolve_like, resolve_vote};
use crate::domain::entities::ContentRecord;
use crate::domain::types::{LikeTarget, LikeTargetKind, VoteDirection};

use super::content::{CONTENT_COLUMNS, ContentRow};
use super::{LIKES_RECEIVED_EXPR, PostgresRepositories, map_sqlx_error};

#[async_trait]
impl EngagementRepo for PostgresRepositories {
    async fn toggle_like(
        &self,
        user_id: Uuid,
        target: LikeTarget,
    ) -> Result<LikeToggled, RepoError> {
        let mut tx = self.begin().await?;

        // Row lock on the target serializes concurrent toggles.
        let author_id: Option<Uuid> = match target.kind.content_kind() {
            Some(kind) => sqlx::query_scalar::<_, Uuid>(
                "SELECT author_id FROM content WHERE id = $1 AND kind = $2 FOR UPDATE",
            )
            .bind(target.id)
            .bind(kind)
            .fetch_optional(&mut *tx)
            .await,
            None => sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(target.id)
                .fetch_optional(&mut *tx)
                .await,
        }
        .map_err(map_sqlx_error)?;
        let author_id = author_id.ok_or(RepoError::NotFound)?;

        let likes_received_sql = format!("SELECT {LIKES_RECEIVED_EXPR}");
        let author_likes_before: i64 = sqlx::query_scalar(&likes_received_sql)
            .bind(author_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let removed = sqlx::query(
            "DELETE FROM likes WHERE user_id = $1 AND target_kind = $2 AND target_id = $3",
        )
        .bind(user_id)
        .bind(target.kind)
        .bind(target.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let change = resolve_like(removed.rows_affected() > 0);
        if change.liked {
            sqlx::query("INSERT INTO likes (user_id, target_kind, target_id) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(target.kind)
                .bind(target.id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        let counter_sql = match target.kind {
            LikeTargetKind::Comment => {
                "UPDATE comments SET likes_count = GREATEST(likes_count + $2, 0) \
                 WHERE id = $1 RETURNING likes_count"
            }
            _ => {
                "UPDATE content SET likes_count = GREATEST(likes_count + $2, 0) \
                 WHERE id = $1 RETURNING likes_count"
            }
        };
        let total_likes: i64 = sqlx::query_scalar(counter_sql)
            .bind(target.id)
            .bind(change.delta)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let author_likes_after: i64 = sqlx::query_scalar(&likes_received_sql)
            .bind(author_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(LikeToggled {
            liked: change.liked,
            total_likes,
            author_id,
            author_likes_before,
            author_likes_after,
        })
    }

    async fn is_liked(&self, user_id: Uuid, target: LikeTarget) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM likes \
             WHERE user_id = $1 AND target_kind = $2 AND target_id = $3)",
        )
        .bind(user_id)
        .bind(target.kind)
        .bind(target.id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn liked_among(
        &self,
        user_id: Uuid,
        kind: LikeTargetKind,
        ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<Uuid> = sqlx::query_scalar(
            "SELECT target_id FROM likes \
             WHERE user_id = $1 AND target_kind = $2 AND target_id = ANY($3)",
        )
        .bind(user_id)
        .bind(kind)
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().collect())
    }

    async fn liked_content(&self, user_id: Uuid) -> Result<Vec<ContentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM likes l \
             JOIN content c ON c.id = l.target_id AND c.kind::text = l.target_kind::text \
             WHERE l.user_id = $1 ORDER BY l.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ContentRecord::from).collect())
    }

    async fn cast_vote(
        &self,
        user_id: Uuid,
        comment_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteTally, RepoError> {
        let mut tx = self.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        if exists.is_none() {
            return Err(RepoError::NotFound);
        }

        let existing: Option<VoteDirection> = sqlx::query_scalar(
            "SELECT direction FROM comment_votes WHERE user_id = $1 AND comment_id = $2",
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let change = resolve_vote(existing, direction);
        match change.vote {
            Some(vote) => sqlx::query(
                "INSERT INTO comment_votes (user_id, comment_id, direction) VALUES ($1, $2, $3) \
                 ON CONFLICT (user_id, comment_id) DO UPDATE SET direction = EXCLUDED.direction",
            )
            .bind(user_id)
            .bind(comment_id)
            .bind(vote),
            None => sqlx::query("DELETE FROM comment_votes WHERE user_id = $1 AND comment_id = $2")
                .bind(user_id)
                .bind(comment_id),
        }
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let (upvotes, downvotes): (i64, i64) = sqlx::query_as(
            "UPDATE comments SET upvotes = upvotes + $2, downvotes = downvotes + $3 \
             WHERE id = $1 RETURNING upvotes, downvotes",
        )
        .bind(comment_id)
        .bind(change.up_delta)
        .bind(change.down_delta)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(VoteTally {
            upvotes,
            downvotes,
            user_vote: change.vote,
        })
    }

    async fn votes_among(
        &self,
        user_id: Uuid,
        comment_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VoteDirection>, RepoError> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, VoteDirection)> = sqlx::query_as(
            "SELECT comment_id, direction FROM comment_votes \
             WHERE user_id = $1 AND comment_id = ANY($2)",
        )
        .bind(user_id)
        .bind(comment_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().collect())
    }
}
