use std::sync::Arc;

use uuid::Uuid;

use crate::application::audit::AuditService;
use crate::application::error::ServiceError;
use crate::application::repos::{ChaptersRepo, ContentRepo, MatureAckRepo, UsersRepo};
use crate::domain::entities::ContentRecord;
use crate::domain::moderation::{Viewer, can_view};
use crate::domain::types::ContentKind;

use super::types::ContentOptions;

/// Stories, videos and shots share one service; the kind travels with each call.
#[derive(Clone)]
pub struct ContentService {
    pub(crate) content: Arc<dyn ContentRepo>,
    pub(crate) chapters: Arc<dyn ChaptersRepo>,
    pub(crate) users: Arc<dyn UsersRepo>,
    pub(crate) acks: Arc<dyn MatureAckRepo>,
    pub(crate) audit: AuditService,
    pub(crate) options: ContentOptions,
}

impl ContentService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        chapters: Arc<dyn ChaptersRepo>,
        users: Arc<dyn UsersRepo>,
        acks: Arc<dyn MatureAckRepo>,
        audit: AuditService,
        options: ContentOptions,
    ) -> Self {
        Self {
            content,
            chapters,
            users,
            acks,
            audit,
            options,
        }
    }

    /// Loads an item the viewer is allowed to see. Hidden items report
    /// `NotFound` so their existence does not leak.
    pub async fn load_visible(
        &self,
        kind: ContentKind,
        id: Uuid,
        viewer: Option<Viewer>,
    ) -> Result<ContentRecord, ServiceError> {
        let record = self
            .content
            .find_content(kind, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(kind.as_str()))?;
        if !can_view(&record, viewer) {
            return Err(ServiceError::not_found(kind.as_str()));
        }
        Ok(record)
    }

    pub(crate) async fn load(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<ContentRecord, ServiceError> {
        self.content
            .find_content(kind, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(kind.as_str()))
    }

    pub(crate) async fn first_chapter_text(&self, story_id: Uuid) -> Result<Option<String>, ServiceError> {
        let chapters = self.chapters.list_chapters(story_id).await?;
        Ok(chapters
            .into_iter()
            .min_by_key(|chapter| chapter.chapter_number)
            .map(|chapter| chapter.content))
    }
}
