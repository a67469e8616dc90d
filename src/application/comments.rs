use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::chapters::ChapterService;
use crate::application::content::ContentService;
use crate::application::error::ServiceError;
use crate::application::repos::{CommentsRepo, EngagementRepo, NewCommentParams, UsersRepo};
use crate::application::sessions::Principal;
use crate::domain::comments::{CommentNode, CommentTree, normalize_content, reply_depth};
use crate::domain::entities::CommentRecord;
use crate::domain::moderation::Viewer;
use crate::domain::types::{CommentTarget, LikeTargetKind, VoteDirection};

const MAX_SELECTED_TEXT_CHARS: usize = 1000;

#[derive(Debug, Clone)]
pub struct PostCommentCommand {
    pub target: CommentTarget,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub selected_text: Option<String>,
    pub text_position: Option<i32>,
}

/// A comment as one viewer sees it, with its replies.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    pub record: CommentRecord,
    pub anonymous_name: String,
    pub is_liked: bool,
    pub my_vote: Option<VoteDirection>,
    pub replies: Vec<CommentThread>,
}

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    engagement: Arc<dyn EngagementRepo>,
    users: Arc<dyn UsersRepo>,
    content: ContentService,
    chapters: ChapterService,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentsRepo>,
        engagement: Arc<dyn EngagementRepo>,
        users: Arc<dyn UsersRepo>,
        content: ContentService,
        chapters: ChapterService,
    ) -> Self {
        Self {
            comments,
            engagement,
            users,
            content,
            chapters,
        }
    }

    pub async fn post(
        &self,
        principal: &Principal,
        command: PostCommentCommand,
    ) -> Result<CommentRecord, ServiceError> {
        let content = normalize_content(&command.content)?;
        ensure_target_visible(
            &self.content,
            &self.chapters,
            command.target,
            Some(principal.viewer()),
        )
        .await?;

        let depth = match command.parent_id {
            Some(parent_id) => {
                let parent = self
                    .comments
                    .find_comment(parent_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("parent comment"))?;
                if parent.target != command.target {
                    return Err(ServiceError::validation(
                        "parent comment belongs to a different target",
                    ));
                }
                reply_depth(parent.depth)?
            }
            None => 0,
        };

        let selected_text = command
            .selected_text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if let Some(text) = &selected_text
            && text.chars().count() > MAX_SELECTED_TEXT_CHARS
        {
            return Err(ServiceError::validation(format!(
                "selected_text exceeds {MAX_SELECTED_TEXT_CHARS} characters"
            )));
        }
        if command.text_position.is_some_and(|position| position < 0) {
            return Err(ServiceError::validation("text_position must not be negative"));
        }

        let record = self
            .comments
            .create_comment(NewCommentParams {
                target: command.target,
                parent_id: command.parent_id,
                user_id: principal.user_id,
                content,
                depth,
                selected_text,
                text_position: command.text_position,
            })
            .await?;
        info!(
            target = "storyloft::application::comments",
            comment_id = %record.id,
            target_kind = %record.target.kind(),
            depth = record.depth,
            "comment posted"
        );
        Ok(record)
    }

    /// The comment tree of one target, annotated for the viewer.
    pub async fn list(
        &self,
        target: CommentTarget,
        viewer: Option<&Principal>,
    ) -> Result<Vec<CommentThread>, ServiceError> {
        ensure_target_visible(
            &self.content,
            &self.chapters,
            target,
            viewer.map(Principal::viewer),
        )
        .await?;

        let records = self.comments.list_comments(target).await?;
        let tree = CommentTree::build(records).map_err(|err| {
            warn!(
                target = "storyloft::application::comments",
                error = %err,
                "stored comments do not form a tree"
            );
            ServiceError::Invariant(err.to_string())
        })?;
        if tree.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = tree.walk().map(|node| node.record.id).collect();
        let author_ids: Vec<Uuid> = tree
            .walk()
            .map(|node| node.record.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors = self.users.find_users(&author_ids).await?;

        let (liked, votes) = match viewer {
            Some(viewer) => (
                self.engagement
                    .liked_among(viewer.user_id, LikeTargetKind::Comment, &ids)
                    .await?,
                self.engagement.votes_among(viewer.user_id, &ids).await?,
            ),
            None => (HashSet::new(), HashMap::new()),
        };

        let names: HashMap<Uuid, String> = authors
            .into_iter()
            .map(|(id, user)| (id, user.anonymous_name))
            .collect();
        let annotations = Annotations {
            names: &names,
            liked: &liked,
            votes: &votes,
        };
        Ok(tree
            .into_roots()
            .into_iter()
            .map(|node| annotations.thread(node))
            .collect())
    }

    pub async fn edit(
        &self,
        principal: &Principal,
        id: Uuid,
        content: &str,
    ) -> Result<CommentRecord, ServiceError> {
        let content = normalize_content(content)?;
        self.authored(principal, id).await?;
        Ok(self.comments.update_comment_content(id, content).await?)
    }

    /// Removes the comment with every reply beneath it.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ServiceError> {
        self.authored(principal, id).await?;
        let removed = self.comments.delete_comment_subtree(id).await?;
        info!(
            target = "storyloft::application::comments",
            comment_id = %id,
            removed,
            "comment thread deleted"
        );
        Ok(())
    }

    /// A comment the viewer can reach through its target.
    pub(crate) async fn visible(
        &self,
        id: Uuid,
        viewer: Option<Viewer>,
    ) -> Result<CommentRecord, ServiceError> {
        let record = self
            .comments
            .find_comment(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("comment"))?;
        ensure_target_visible(&self.content, &self.chapters, record.target, viewer).await?;
        Ok(record)
    }

    async fn authored(&self, principal: &Principal, id: Uuid) -> Result<CommentRecord, ServiceError> {
        let record = self.visible(id, Some(principal.viewer())).await?;
        if record.user_id != principal.user_id {
            return Err(ServiceError::forbidden("only the author can change this comment"));
        }
        Ok(record)
    }
}

/// Fails with `NotFound` unless the viewer may see what the comment targets.
pub(crate) async fn ensure_target_visible(
    content: &ContentService,
    chapters: &ChapterService,
    target: CommentTarget,
    viewer: Option<Viewer>,
) -> Result<(), ServiceError> {
    match target.content() {
        Some((kind, id)) => {
            content.load_visible(kind, id, viewer).await?;
        }
        None => {
            chapters.visible(target.id(), viewer).await?;
        }
    }
    Ok(())
}

struct Annotations<'a> {
    names: &'a HashMap<Uuid, String>,
    liked: &'a HashSet<Uuid>,
    votes: &'a HashMap<Uuid, VoteDirection>,
}

impl Annotations<'_> {
    fn thread(&self, node: CommentNode) -> CommentThread {
        let CommentNode { record, replies } = node;
        CommentThread {
            anonymous_name: self
                .names
                .get(&record.user_id)
                .cloned()
                .unwrap_or_else(|| "Anonymous".to_string()),
            is_liked: self.liked.contains(&record.id),
            my_vote: self.votes.get(&record.id).copied(),
            replies: replies.into_iter().map(|reply| self.thread(reply)).collect(),
            record,
        }
    }
}
