use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    ChaptersRepo, MAX_CHAPTER_NUMBER, NewChapterParams, RepoError, UpdateChapterParams,
};
use crate::domain::entities::ChapterRecord;

use super::{PostgresRepositories, map_sqlx_error};

const CHAPTER_COLUMNS: &str =
    "id, story_id, chapter_number, title, content, published, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ChapterRow {
    id: Uuid,
    story_id: Uuid,
    chapter_number: i32,
    title: String,
    content: String,
    published: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ChapterRow> for ChapterRecord {
    fn from(row: ChapterRow) -> Self {
        Self {
            id: row.id,
            story_id: row.story_id,
            chapter_number: row.chapter_number,
            title: row.title,
            content: row.content,
            published: row.published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ChaptersRepo for PostgresRepositories {
    async fn create_chapter(&self, params: NewChapterParams) -> Result<ChapterRecord, RepoError> {
        let row = sqlx::query_as::<_, ChapterRow>(&format!(
            "INSERT INTO chapters (id, story_id, chapter_number, title, content, published) \
             VALUES ($1, $2, COALESCE($3, (SELECT COALESCE(MAX(chapter_number), 0) + 1 \
                                           FROM chapters WHERE story_id = $2)), $4, $5, $6) \
             RETURNING {CHAPTER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.story_id)
        .bind(params.chapter_number)
        .bind(&params.title)
        .bind(&params.content)
        .bind(params.published)
        .fetch_one(self.pool())
        .await
        .map_err(|err| match map_sqlx_error(err) {
            // Only the auto-assigned number can overrun the range check.
            RepoError::Integrity { .. } => RepoError::InvalidInput {
                message: format!("story already uses chapter_number {MAX_CHAPTER_NUMBER}"),
            },
            other => other,
        })?;

        Ok(row.into())
    }

    async fn find_chapter(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepoError> {
        let row = sqlx::query_as::<_, ChapterRow>(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(ChapterRecord::from))
    }

    async fn list_chapters(&self, story_id: Uuid) -> Result<Vec<ChapterRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ChapterRow>(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE story_id = $1 ORDER BY chapter_number"
        ))
        .bind(story_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ChapterRecord::from).collect())
    }

    async fn update_chapter(
        &self,
        params: UpdateChapterParams,
    ) -> Result<ChapterRecord, RepoError> {
        let row = sqlx::query_as::<_, ChapterRow>(&format!(
            "UPDATE chapters SET chapter_number = $2, title = $3, content = $4, updated_at = now() \
             WHERE id = $1 RETURNING {CHAPTER_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.chapter_number)
        .bind(&params.title)
        .bind(&params.content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn set_chapter_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<ChapterRecord, RepoError> {
        let row = sqlx::query_as::<_, ChapterRow>(&format!(
            "UPDATE chapters SET published = $2, updated_at = now() \
             WHERE id = $1 RETURNING {CHAPTER_COLUMNS}"
        ))
        .bind(id)
        .bind(published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_chapter(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        sqlx::query(
            "DELETE FROM likes WHERE target_kind = 'comment' \
             AND target_id IN (SELECT id FROM comments WHERE chapter_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let deleted = sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if deleted.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}
