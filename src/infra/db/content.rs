use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use storyloft_api_types::StatusCounts;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    ContentFilter, ContentRepo, ContentScope, Guarded, NewContentParams, RepoError,
    UpdateContentParams,
};
use crate::domain::entities::ContentRecord;
use crate::domain::moderation::{ReasonUpdate, StatusChange};
use crate::domain::types::{ContentKind, LikeTargetKind, ModerationStatus};

use super::util::contains_pattern;
use super::{PostgresRepositories, map_sqlx_error};

pub(super) const CONTENT_COLUMNS: &str = "c.id, c.kind, c.author_id, c.title, c.body, c.media_url, c.thumbnail_url, \
     c.tags, c.mature_content, c.status, c.rejection_reason, c.likes_count, c.views_count, \
     c.created_at, c.updated_at, c.published_at";

#[derive(sqlx::FromRow)]
pub(super) struct ContentRow {
    id: Uuid,
    kind: ContentKind,
    author_id: Uuid,
    title: String,
    body: String,
    media_url: Option<String>,
    thumbnail_url: Option<String>,
    tags: Vec<String>,
    mature_content: bool,
    status: ModerationStatus,
    rejection_reason: Option<String>,
    likes_count: i64,
    views_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    published_at: Option<OffsetDateTime>,
}

impl From<ContentRow> for ContentRecord {
    fn from(row: ContentRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            author_id: row.author_id,
            title: row.title,
            body: row.body,
            media_url: row.media_url,
            thumbnail_url: row.thumbnail_url,
            tags: row.tags,
            mature_content: row.mature_content,
            status: row.status,
            rejection_reason: row.rejection_reason,
            likes_count: row.likes_count,
            views_count: row.views_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
        }
    }
}

fn status_names(statuses: &[ModerationStatus]) -> Vec<String> {
    statuses
        .iter()
        .map(|status| status.as_str().to_string())
        .collect()
}

impl PostgresRepositories {
    /// Status of an existing row, used to report why a guarded write missed.
    async fn stale_status(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Guarded<ContentRecord>, RepoError> {
        let status = sqlx::query_scalar::<_, ModerationStatus>(
            "SELECT status FROM content WHERE id = $1 AND kind = $2",
        )
        .bind(id)
        .bind(kind)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        status.map(Guarded::Stale).ok_or(RepoError::NotFound)
    }

    fn push_scope<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        kind: ContentKind,
        scope: ContentScope,
        filter: &'q ContentFilter,
    ) {
        qb.push(" WHERE c.kind = ");
        qb.push_bind(kind);

        match scope {
            ContentScope::Public => {
                qb.push(" AND c.status = ");
                qb.push_bind(ModerationStatus::Approved);
            }
            ContentScope::Author {
                author_id,
                include_unapproved,
            } => {
                qb.push(" AND c.author_id = ");
                qb.push_bind(author_id);
                if !include_unapproved {
                    qb.push(" AND c.status = ");
                    qb.push_bind(ModerationStatus::Approved);
                }
            }
            ContentScope::Pending => {
                qb.push(" AND c.status = ");
                qb.push_bind(ModerationStatus::Pending);
            }
        }

        if let Some(search) = filter.search.as_ref() {
            let pattern = contains_pattern(search);
            qb.push(" AND (c.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR c.body ILIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }

        if let Some(tag) = filter.tag.as_ref() {
            qb.push(" AND EXISTS (SELECT 1 FROM unnest(c.tags) AS t(tag) WHERE lower(t.tag) = lower(");
            qb.push_bind(tag);
            qb.push("))");
        }
    }
}

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn create_content(&self, params: NewContentParams) -> Result<ContentRecord, RepoError> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "INSERT INTO content AS c (id, kind, author_id, title, body, media_url, thumbnail_url, \
             tags, mature_content, status, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.kind)
        .bind(params.author_id)
        .bind(&params.title)
        .bind(&params.body)
        .bind(&params.media_url)
        .bind(&params.thumbnail_url)
        .bind(&params.tags)
        .bind(params.mature_content)
        .bind(params.status)
        .bind(params.published_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, RepoError> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content c WHERE c.id = $1 AND c.kind = $2"
        ))
        .bind(id)
        .bind(kind)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ContentRecord::from))
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<Guarded<ContentRecord>, RepoError> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "UPDATE content AS c SET title = $3, body = $4, media_url = $5, thumbnail_url = $6, \
             tags = $7, mature_content = $8, updated_at = now() \
             WHERE c.id = $1 AND c.kind = $2 AND c.status::text = ANY($9) \
             RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.kind)
        .bind(&params.title)
        .bind(&params.body)
        .bind(&params.media_url)
        .bind(&params.thumbnail_url)
        .bind(&params.tags)
        .bind(params.mature_content)
        .bind(status_names(&params.expected))
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Guarded::Applied(row.into())),
            None => self.stale_status(params.kind, params.id).await,
        }
    }

    async fn transition_status(
        &self,
        kind: ContentKind,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Guarded<ContentRecord>, RepoError> {
        let (reason_mode, reason) = match change.reason {
            ReasonUpdate::Keep => ("keep", None),
            ReasonUpdate::Clear => ("clear", None),
            ReasonUpdate::Set(reason) => ("set", Some(reason)),
        };

        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "UPDATE content AS c SET status = $3, \
             published_at = COALESCE(c.published_at, $4), \
             rejection_reason = CASE $5 WHEN 'keep' THEN c.rejection_reason \
                                        WHEN 'clear' THEN NULL ELSE $6 END, \
             updated_at = now() \
             WHERE c.id = $1 AND c.kind = $2 AND c.status::text = ANY($7) \
             RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(id)
        .bind(kind)
        .bind(change.to)
        .bind(change.published_at)
        .bind(reason_mode)
        .bind(reason)
        .bind(status_names(&change.expected))
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Guarded::Applied(row.into())),
            None => self.stale_status(kind, id).await,
        }
    }

    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        // Likes are polymorphic rows without foreign keys; clear them by hand.
        sqlx::query(
            "DELETE FROM likes WHERE target_kind = 'comment' AND target_id IN ( \
                 SELECT m.id FROM comments m \
                 WHERE m.story_id = $1 OR m.video_id = $1 OR m.shot_id = $1 \
                    OR m.chapter_id IN (SELECT ch.id FROM chapters ch WHERE ch.story_id = $1))",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM likes WHERE target_kind = $1 AND target_id = $2")
            .bind(LikeTargetKind::from(kind))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = sqlx::query("DELETE FROM content WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if deleted.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn list_content(
        &self,
        kind: ContentKind,
        scope: ContentScope,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<ContentRecord>, RepoError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM content c");
        Self::push_scope(&mut count_qb, kind, scope, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::new(format!("SELECT {CONTENT_COLUMNS} FROM content c"));
        Self::push_scope(&mut qb, kind, scope, filter);
        qb.push(match scope {
            ContentScope::Public => " ORDER BY c.published_at DESC NULLS LAST, c.created_at DESC",
            ContentScope::Author { .. } => " ORDER BY c.created_at DESC",
            ContentScope::Pending => " ORDER BY c.updated_at ASC",
        });
        qb.push(", c.id LIMIT ");
        qb.push_bind(page.limit() as i64);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset() as i64);

        let rows = qb
            .build_query_as::<ContentRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::new(
            rows.into_iter().map(ContentRecord::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }

    async fn count_by_status(&self, kind: ContentKind) -> Result<StatusCounts, RepoError> {
        let rows = sqlx::query_as::<_, (ModerationStatus, i64)>(
            "SELECT status, COUNT(*) FROM content WHERE kind = $1 GROUP BY status",
        )
        .bind(kind)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let count = Self::convert_count(count)?;
            counts.total += count;
            match status {
                ModerationStatus::Draft => counts.draft = count,
                ModerationStatus::Pending => counts.pending = count,
                ModerationStatus::Approved => counts.approved = count,
                ModerationStatus::Rejected => counts.rejected = count,
            }
        }
        Ok(counts)
    }

    async fn increment_views(&self, kind: ContentKind, id: Uuid) -> Result<(), RepoError> {
        let updated = sqlx::query(
            "UPDATE content SET views_count = views_count + 1 WHERE id = $1 AND kind = $2",
        )
        .bind(id)
        .bind(kind)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
