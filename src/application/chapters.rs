use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::repos::{
    ChaptersRepo, ContentRepo, MAX_CHAPTER_NUMBER, NewChapterParams, RepoError,
    UpdateChapterParams,
};
use crate::application::sessions::Principal;
use crate::domain::entities::{ChapterRecord, ContentRecord};
use crate::domain::moderation::{Viewer, can_view, ensure_owner, is_owner};
use crate::domain::types::ContentKind;

const MAX_CHAPTER_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct CreateChapterCommand {
    pub title: String,
    pub content: String,
    pub chapter_number: Option<i32>,
    pub published: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateChapterCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub chapter_number: Option<i32>,
}

/// Chapters belong to a story and follow its visibility.
#[derive(Clone)]
pub struct ChapterService {
    chapters: Arc<dyn ChaptersRepo>,
    content: Arc<dyn ContentRepo>,
}

impl ChapterService {
    pub fn new(chapters: Arc<dyn ChaptersRepo>, content: Arc<dyn ContentRepo>) -> Self {
        Self { chapters, content }
    }

    /// Chapters of a story in reading order. Unpublished ones are listed only
    /// for the author and admins.
    pub async fn list(
        &self,
        story_id: Uuid,
        viewer: Option<&Principal>,
    ) -> Result<Vec<ChapterRecord>, ServiceError> {
        let viewer = viewer.map(Principal::viewer);
        let story = self.visible_story(story_id, viewer).await?;
        let privileged = privileged(&story, viewer);

        let mut chapters = self.chapters.list_chapters(story_id).await?;
        chapters.retain(|chapter| chapter.published || privileged);
        chapters.sort_by_key(|chapter| chapter.chapter_number);
        Ok(chapters)
    }

    pub async fn get(
        &self,
        id: Uuid,
        viewer: Option<&Principal>,
    ) -> Result<ChapterRecord, ServiceError> {
        self.visible(id, viewer.map(Principal::viewer)).await
    }

    pub async fn create(
        &self,
        principal: &Principal,
        story_id: Uuid,
        command: CreateChapterCommand,
    ) -> Result<ChapterRecord, ServiceError> {
        let story = self
            .visible_story(story_id, Some(principal.viewer()))
            .await?;
        ensure_owner(&story, principal.viewer())?;

        if let Some(number) = command.chapter_number {
            validate_number(number)?;
        }
        let params = NewChapterParams {
            story_id,
            chapter_number: command.chapter_number,
            title: validate_title(&command.title)?,
            content: command.content,
            published: command.published,
        };

        self.chapters
            .create_chapter(params)
            .await
            .map_err(duplicate_number)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        command: UpdateChapterCommand,
    ) -> Result<ChapterRecord, ServiceError> {
        let chapter = self.owned(principal, id).await?;

        let chapter_number = match command.chapter_number {
            Some(number) => validate_number(number)?,
            None => chapter.chapter_number,
        };
        let title = match command.title {
            Some(title) => validate_title(&title)?,
            None => chapter.title,
        };
        let params = UpdateChapterParams {
            id,
            chapter_number,
            title,
            content: command.content.unwrap_or(chapter.content),
        };

        self.chapters
            .update_chapter(params)
            .await
            .map_err(duplicate_number)
    }

    pub async fn set_published(
        &self,
        principal: &Principal,
        id: Uuid,
        published: bool,
    ) -> Result<ChapterRecord, ServiceError> {
        self.owned(principal, id).await?;
        Ok(self.chapters.set_chapter_published(id, published).await?)
    }

    /// Removes the chapter and its comments.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ServiceError> {
        self.owned(principal, id).await?;
        Ok(self.chapters.delete_chapter(id).await?)
    }

    /// Resolves a chapter the viewer may see, for comment targeting.
    pub(crate) async fn visible(
        &self,
        id: Uuid,
        viewer: Option<Viewer>,
    ) -> Result<ChapterRecord, ServiceError> {
        let chapter = self.find(id).await?;
        let story = self.visible_story(chapter.story_id, viewer).await?;
        if !chapter.published && !privileged(&story, viewer) {
            return Err(ServiceError::not_found("chapter"));
        }
        Ok(chapter)
    }

    async fn owned(&self, principal: &Principal, id: Uuid) -> Result<ChapterRecord, ServiceError> {
        let chapter = self.find(id).await?;
        let story = self
            .visible_story(chapter.story_id, Some(principal.viewer()))
            .await?;
        ensure_owner(&story, principal.viewer())?;
        Ok(chapter)
    }

    async fn find(&self, id: Uuid) -> Result<ChapterRecord, ServiceError> {
        self.chapters
            .find_chapter(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("chapter"))
    }

    async fn visible_story(
        &self,
        story_id: Uuid,
        viewer: Option<Viewer>,
    ) -> Result<ContentRecord, ServiceError> {
        let story = self
            .content
            .find_content(ContentKind::Story, story_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("story"))?;
        if !can_view(&story, viewer) {
            return Err(ServiceError::not_found("story"));
        }
        Ok(story)
    }
}

fn privileged(story: &ContentRecord, viewer: Option<Viewer>) -> bool {
    is_owner(story, viewer) || viewer.is_some_and(Viewer::is_admin)
}

fn validate_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("chapter title must not be empty"));
    }
    if title.chars().count() > MAX_CHAPTER_TITLE_CHARS {
        return Err(ServiceError::validation(format!(
            "chapter title exceeds {MAX_CHAPTER_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_number(number: i32) -> Result<i32, ServiceError> {
    if !(1..=MAX_CHAPTER_NUMBER).contains(&number) {
        return Err(ServiceError::validation(format!(
            "chapter_number must be between 1 and {MAX_CHAPTER_NUMBER}"
        )));
    }
    Ok(number)
}

fn duplicate_number(err: RepoError) -> ServiceError {
    match err {
        RepoError::Duplicate { .. } => {
            ServiceError::conflict("chapter_number is already used in this story")
        }
        other => other.into(),
    }
}
