use metrics::counter;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::repos::{Guarded, NewContentParams, UpdateContentParams};
use crate::application::sessions::Principal;
use crate::domain::entities::ContentRecord;
use crate::domain::moderation::{
    Moderated, SUBMITTABLE, Submission, ensure_can_delete, ensure_editable, ensure_owner, plan_approve,
    plan_reject, plan_submit,
};
use crate::domain::tags::normalize_tags;
use crate::domain::types::{ContentKind, ModerationStatus};

use super::service::ContentService;
use super::types::{
    ContentSnapshot, CreateContentCommand, Decision, UpdateContentCommand, trimmed_opt,
};

const METRIC_MODERATION_DECISIONS: &str = "storyloft_moderation_decisions_total";
const MAX_TITLE_CHARS: usize = 200;

impl ContentService {
    /// Creates a draft, or a pending item when the author asks to submit
    /// right away or the site submits everything on creation.
    pub async fn create(
        &self,
        principal: &Principal,
        kind: ContentKind,
        command: CreateContentCommand,
    ) -> Result<ContentRecord, ServiceError> {
        let submit = command.submit || self.options.submit_on_create;
        let mut params = new_content_params(principal.user_id, kind, command)?;

        if submit {
            plan_submit(&preview(&params))?;
            params.status = ModerationStatus::Pending;
        }

        let record = self.content.create_content(params).await?;
        info!(
            target = "storyloft::application::content",
            kind = %kind,
            id = %record.id,
            status = %record.status,
            "content created"
        );
        Ok(record)
    }

    /// Admin-only path that publishes without a review round.
    pub async fn create_preapproved(
        &self,
        principal: &Principal,
        kind: ContentKind,
        command: CreateContentCommand,
    ) -> Result<ContentRecord, ServiceError> {
        if !principal.is_admin() {
            return Err(ServiceError::forbidden("admin role required"));
        }
        let mut params = new_content_params(principal.user_id, kind, command)?;
        preview(&params).check_reviewable()?;
        params.status = ModerationStatus::Approved;
        params.published_at = Some(OffsetDateTime::now_utc());

        let record = self.content.create_content(params).await?;
        let entity_id = record.id.to_string();
        self.audit
            .record(
                &principal.actor(),
                "content.create_preapproved",
                kind.as_str(),
                Some(entity_id.as_str()),
                Some(&ContentSnapshot::of(&record)),
            )
            .await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
        command: UpdateContentCommand,
    ) -> Result<ContentRecord, ServiceError> {
        let record = self.load_visible(kind, id, Some(principal.viewer())).await?;
        ensure_editable(&record, principal.viewer())?;

        let title = match command.title {
            Some(title) => validate_title(&title)?,
            None => record.title.clone(),
        };
        let tags = match command.tags {
            Some(tags) => normalize_tags(tags)?,
            None => record.tags.clone(),
        };
        let params = UpdateContentParams {
            kind,
            id,
            title,
            body: command.body.unwrap_or_else(|| record.body.clone()),
            media_url: match command.media_url {
                Some(url) => trimmed_opt(Some(url)),
                None => record.media_url.clone(),
            },
            thumbnail_url: match command.thumbnail_url {
                Some(url) => trimmed_opt(Some(url)),
                None => record.thumbnail_url.clone(),
            },
            tags,
            mature_content: command.mature_content.unwrap_or(record.mature_content),
            expected: SUBMITTABLE.to_vec(),
        };

        match self.content.update_content(params).await? {
            Guarded::Applied(updated) => Ok(updated),
            Guarded::Stale(status) => Err(ServiceError::conflict(format!(
                "cannot edit an item that is {status}"
            ))),
        }
    }

    /// Sends a draft or rejected item to the review queue.
    pub async fn submit(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<ContentRecord, ServiceError> {
        let record = self.load_visible(kind, id, Some(principal.viewer())).await?;
        ensure_owner(&record, principal.viewer())?;

        let first_chapter = match kind {
            ContentKind::Story => self.first_chapter_text(id).await?,
            ContentKind::Video | ContentKind::Shot => None,
        };
        let change = plan_submit(&Submission::new(&record, first_chapter.as_deref()))?;

        match self.content.transition_status(kind, id, change).await? {
            Guarded::Applied(updated) => {
                info!(
                    target = "storyloft::application::content",
                    kind = %kind,
                    id = %id,
                    "content submitted for review"
                );
                Ok(updated)
            }
            Guarded::Stale(status) => Err(ServiceError::conflict(format!(
                "cannot submit an item that is {status}"
            ))),
        }
    }

    /// Approves or rejects a pending item. Only one decision can win.
    pub async fn decide(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
        decision: Decision,
    ) -> Result<ContentRecord, ServiceError> {
        if !principal.is_admin() {
            return Err(ServiceError::forbidden("admin role required"));
        }
        let record = self.load(kind, id).await?;
        let change = match &decision {
            Decision::Approve => plan_approve(&record, OffsetDateTime::now_utc())?,
            Decision::Reject { reason } => plan_reject(&record, reason)?,
        };

        let updated = match self.content.transition_status(kind, id, change).await? {
            Guarded::Applied(updated) => updated,
            Guarded::Stale(_) => return Err(ServiceError::conflict("not pending")),
        };

        counter!(METRIC_MODERATION_DECISIONS, "decision" => decision.label()).increment(1);
        let entity_id = id.to_string();
        self.audit
            .record(
                &principal.actor(),
                &format!("content.{}", decision.label()),
                kind.as_str(),
                Some(entity_id.as_str()),
                Some(&ContentSnapshot::of(&updated)),
            )
            .await?;
        info!(
            target = "storyloft::application::content",
            kind = %kind,
            id = %id,
            decision = decision.label(),
            "moderation decision recorded"
        );
        Ok(updated)
    }

    /// Removes an item together with everything attached to it.
    pub async fn delete(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<(), ServiceError> {
        let record = self.load_visible(kind, id, Some(principal.viewer())).await?;
        ensure_can_delete(&record, principal.viewer())?;

        self.content.delete_content(kind, id).await?;

        let entity_id = id.to_string();
        self.audit
            .record(
                &principal.actor(),
                "content.delete",
                kind.as_str(),
                Some(entity_id.as_str()),
                Some(&ContentSnapshot::of(&record)),
            )
            .await?;
        Ok(())
    }

    /// Records that the caller has agreed to view mature content.
    pub async fn acknowledge_mature(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<(), ServiceError> {
        let record = self.load_visible(kind, id, Some(principal.viewer())).await?;
        self.acks.acknowledge(principal.user_id, record.id).await?;
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ServiceError::validation(format!(
            "title exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn new_content_params(
    author_id: Uuid,
    kind: ContentKind,
    command: CreateContentCommand,
) -> Result<NewContentParams, ServiceError> {
    Ok(NewContentParams {
        kind,
        author_id,
        title: validate_title(&command.title)?,
        body: command.body,
        media_url: trimmed_opt(command.media_url),
        thumbnail_url: trimmed_opt(command.thumbnail_url),
        tags: normalize_tags(command.tags)?,
        mature_content: command.mature_content,
        status: ModerationStatus::Draft,
        published_at: None,
    })
}

/// The record `params` would produce, used to validate before writing.
fn preview(params: &NewContentParams) -> ContentRecord {
    let now = OffsetDateTime::now_utc();
    ContentRecord {
        id: Uuid::nil(),
        kind: params.kind,
        author_id: params.author_id,
        title: params.title.clone(),
        body: params.body.clone(),
        media_url: params.media_url.clone(),
        thumbnail_url: params.thumbnail_url.clone(),
        tags: params.tags.clone(),
        mature_content: params.mature_content,
        status: ModerationStatus::Draft,
        rejection_reason: None,
        likes_count: 0,
        views_count: 0,
        created_at: now,
        updated_at: now,
        published_at: None,
    }
}
