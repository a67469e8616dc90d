use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, NewCommentParams, RepoError};
use crate::domain::entities::CommentRecord;
use crate::domain::types::{CommentTarget, CommentTargetKind};

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_COLUMNS: &str = "id, target_kind, \
     COALESCE(story_id, chapter_id, video_id, shot_id) AS target_id, parent_id, user_id, content, \
     depth, upvotes, downvotes, likes_count, selected_text, text_position, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    target_kind: CommentTargetKind,
    target_id: Option<Uuid>,
    parent_id: Option<Uuid>,
    user_id: Uuid,
    content: String,
    depth: i16,
    upvotes: i64,
    downvotes: i64,
    likes_count: i64,
    selected_text: Option<String>,
    text_position: Option<i32>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<CommentRow> for CommentRecord {
    type Error = RepoError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let target_id = row.target_id.ok_or_else(|| RepoError::Integrity {
            message: format!("comment {} has no target", row.id),
        })?;
        let depth = u8::try_from(row.depth).map_err(|_| RepoError::Integrity {
            message: format!("comment {} has depth {}", row.id, row.depth),
        })?;

        Ok(Self {
            id: row.id,
            target: CommentTarget::new(row.target_kind, target_id),
            parent_id: row.parent_id,
            user_id: row.user_id,
            content: row.content,
            depth,
            upvotes: row.upvotes,
            downvotes: row.downvotes,
            likes_count: row.likes_count,
            selected_text: row.selected_text,
            text_position: row.text_position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Column holding the target id for each kind.
fn target_column(kind: CommentTargetKind) -> &'static str {
    match kind {
        CommentTargetKind::Story => "story_id",
        CommentTargetKind::Chapter => "chapter_id",
        CommentTargetKind::Video => "video_id",
        CommentTargetKind::Shot => "shot_id",
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError> {
        let column = target_column(params.target.kind());
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "INSERT INTO comments (id, target_kind, {column}, parent_id, user_id, content, depth, \
             selected_text, text_position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.target.kind())
        .bind(params.target.id())
        .bind(params.parent_id)
        .bind(params.user_id)
        .bind(&params.content)
        .bind(i16::from(params.depth))
        .bind(&params.selected_text)
        .bind(params.text_position)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(CommentRecord::try_from).transpose()
    }

    async fn list_comments(&self, target: CommentTarget) -> Result<Vec<CommentRecord>, RepoError> {
        let column = target_column(target.kind());
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE {column} = $1 ORDER BY created_at, id"
        ))
        .bind(target.id())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(CommentRecord::try_from).collect()
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "UPDATE comments SET content = $2, updated_at = now() WHERE id = $1 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn delete_comment_subtree(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut tx = self.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar(
            "WITH RECURSIVE subtree AS ( \
                 SELECT id FROM comments WHERE id = $1 \
                 UNION ALL \
                 SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id) \
             SELECT id FROM subtree",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if ids.is_empty() {
            return Err(RepoError::NotFound);
        }

        sqlx::query("DELETE FROM likes WHERE target_kind = 'comment' AND target_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = sqlx::query("DELETE FROM comments WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(deleted.rows_affected())
    }
}
