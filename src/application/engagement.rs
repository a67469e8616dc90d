//! Likes on content and comments, and votes on comments.

use std::sync::Arc;

use metrics::counter;
use tracing::info;
use uuid::Uuid;

use crate::application::comments::CommentService;
use crate::application::content::{ContentItem, ContentService};
use crate::application::error::ServiceError;
use crate::application::repos::{EngagementRepo, RepoError, VoteTally};
use crate::application::sessions::Principal;
use crate::domain::moderation::can_view;
use crate::domain::points::milestones_crossed;
use crate::domain::types::{LikeTarget, LikeTargetKind, VoteDirection};

const METRIC_LIKES_TOGGLED: &str = "storyloft_likes_toggled_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub total_likes: i64,
    /// Like milestones the target's author newly reached, when any.
    pub points_earned: Option<i64>,
}

#[derive(Clone)]
pub struct EngagementService {
    repo: Arc<dyn EngagementRepo>,
    content: ContentService,
    comments: CommentService,
}

impl EngagementService {
    pub fn new(
        repo: Arc<dyn EngagementRepo>,
        content: ContentService,
        comments: CommentService,
    ) -> Self {
        Self {
            repo,
            content,
            comments,
        }
    }

    /// Likes the target, or removes the caller's like if there is one.
    pub async fn toggle_like(
        &self,
        principal: &Principal,
        target: LikeTarget,
    ) -> Result<LikeOutcome, ServiceError> {
        self.ensure_visible(principal, target).await?;

        let toggled = self
            .repo
            .toggle_like(principal.user_id, target)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ServiceError::not_found(target.kind.as_str()),
                other => other.into(),
            })?;

        let crossed = milestones_crossed(toggled.author_likes_before, toggled.author_likes_after);
        counter!(
            METRIC_LIKES_TOGGLED,
            "target" => target.kind.as_str(),
            "liked" => if toggled.liked { "true" } else { "false" }
        )
        .increment(1);
        if crossed > 0 {
            info!(
                target = "storyloft::application::engagement",
                author_id = %toggled.author_id,
                crossed,
                "author reached a like milestone"
            );
        }

        Ok(LikeOutcome {
            liked: toggled.liked,
            total_likes: toggled.total_likes,
            points_earned: (crossed > 0).then_some(crossed),
        })
    }

    pub async fn is_liked(
        &self,
        principal: &Principal,
        target: LikeTarget,
    ) -> Result<bool, ServiceError> {
        self.ensure_visible(principal, target).await?;
        Ok(self.repo.is_liked(principal.user_id, target).await?)
    }

    /// Content the caller likes and can still see, newest like first.
    pub async fn liked_content(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ContentItem>, ServiceError> {
        let viewer = principal.viewer();
        let records = self
            .repo
            .liked_content(principal.user_id)
            .await?
            .into_iter()
            .filter(|record| can_view(record, Some(viewer)))
            .collect();
        self.content.annotate(records, Some(principal)).await
    }

    /// Same direction twice retracts the vote; the other direction moves it.
    pub async fn vote(
        &self,
        principal: &Principal,
        comment_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteTally, ServiceError> {
        self.comments
            .visible(comment_id, Some(principal.viewer()))
            .await?;
        self.repo
            .cast_vote(principal.user_id, comment_id, direction)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ServiceError::not_found("comment"),
                other => other.into(),
            })
    }

    async fn ensure_visible(
        &self,
        principal: &Principal,
        target: LikeTarget,
    ) -> Result<(), ServiceError> {
        let viewer = Some(principal.viewer());
        match target.kind.content_kind() {
            Some(kind) => {
                self.content.load_visible(kind, target.id, viewer).await?;
            }
            None => {
                debug_assert_eq!(target.kind, LikeTargetKind::Comment);
                self.comments.visible(target.id, viewer).await?;
            }
        }
        Ok(())
    }
}
