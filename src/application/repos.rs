//! Repository traits describing persistence adapters.
//!
//! Every mutation is one call. Calls that read-then-write (toggles, votes,
//! status decisions, referral credit) must be atomic inside the adapter.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use storyloft_api_types::StatusCounts;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{
    AuditLogRecord, ChapterRecord, CommentRecord, ContentRecord, SessionRecord, UserRecord,
};
use crate::domain::moderation::StatusChange;
use crate::domain::points::PointsProfile;
use crate::domain::types::{
    CommentTarget, ContentKind, LikeTarget, LikeTargetKind, ModerationStatus, SessionKind,
    UserRole, VoteDirection,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }
}

/// Result of a write guarded by the item's current moderation status.
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded<T> {
    Applied(T),
    /// The stored status no longer matched; carries what was found.
    Stale(ModerationStatus),
}

// ---------------------------------------------------------------- users

#[derive(Debug, Clone)]
pub struct NewUserParams {
    pub username: String,
    pub anonymous_name: String,
    pub role: UserRole,
    /// Uppercase code the new user will hand out.
    pub referral_code: String,
    /// Uppercase code the new user signed up with, if any.
    pub referred_with: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user: UserRecord,
    pub referrer: Option<Uuid>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// Inserts the user and, in the same transaction, credits the referrer
    /// whose code matches `referred_with`. Unknown codes are ignored.
    async fn register_user(&self, params: NewUserParams) -> Result<RegisteredUser, RepoError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserRecord>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, RepoError>;
    async fn count_users(&self) -> Result<u64, RepoError>;
}

// ---------------------------------------------------------------- content

#[derive(Debug, Clone)]
pub struct NewContentParams {
    pub kind: ContentKind,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub mature_content: bool,
    pub status: ModerationStatus,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct UpdateContentParams {
    pub kind: ContentKind,
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub mature_content: bool,
    pub expected: Vec<ModerationStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentScope {
    /// Approved items, newest publication first.
    Public,
    /// One author's items; unapproved ones only when `include_unapproved`.
    Author {
        author_id: Uuid,
        include_unapproved: bool,
    },
    /// The review queue, oldest first.
    Pending,
}

#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub search: Option<String>,
    pub tag: Option<String>,
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn create_content(&self, params: NewContentParams) -> Result<ContentRecord, RepoError>;
    async fn find_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, RepoError>;
    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<Guarded<ContentRecord>, RepoError>;
    /// Applies `change` only if the stored status is one of `change.expected`.
    async fn transition_status(
        &self,
        kind: ContentKind,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Guarded<ContentRecord>, RepoError>;
    /// Removes the item with its chapters, comments, votes, likes and
    /// acknowledgements.
    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<(), RepoError>;
    async fn list_content(
        &self,
        kind: ContentKind,
        scope: ContentScope,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<ContentRecord>, RepoError>;
    async fn count_by_status(&self, kind: ContentKind) -> Result<StatusCounts, RepoError>;
    async fn increment_views(&self, kind: ContentKind, id: Uuid) -> Result<(), RepoError>;
}

// ---------------------------------------------------------------- chapters

/// Highest chapter number a story may hold, explicit or auto-assigned.
pub const MAX_CHAPTER_NUMBER: i32 = 100_000;

#[derive(Debug, Clone)]
pub struct NewChapterParams {
    pub story_id: Uuid,
    /// Assigned as the next free number when absent.
    pub chapter_number: Option<i32>,
    pub title: String,
    pub content: String,
    pub published: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateChapterParams {
    pub id: Uuid,
    pub chapter_number: i32,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait ChaptersRepo: Send + Sync {
    async fn create_chapter(&self, params: NewChapterParams) -> Result<ChapterRecord, RepoError>;
    async fn find_chapter(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepoError>;
    async fn list_chapters(&self, story_id: Uuid) -> Result<Vec<ChapterRecord>, RepoError>;
    async fn update_chapter(&self, params: UpdateChapterParams)
    -> Result<ChapterRecord, RepoError>;
    async fn set_chapter_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<ChapterRecord, RepoError>;
    /// Removes the chapter and the comments attached to it.
    async fn delete_chapter(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---------------------------------------------------------------- comments

#[derive(Debug, Clone)]
pub struct NewCommentParams {
    pub target: CommentTarget,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub content: String,
    pub depth: u8,
    pub selected_text: Option<String>,
    pub text_position: Option<i32>,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;
    async fn list_comments(&self, target: CommentTarget) -> Result<Vec<CommentRecord>, RepoError>;
    async fn update_comment_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<CommentRecord, RepoError>;
    /// Removes the comment and all replies beneath it; returns how many went.
    async fn delete_comment_subtree(&self, id: Uuid) -> Result<u64, RepoError>;
}

// ---------------------------------------------------------------- engagement

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggled {
    pub liked: bool,
    pub total_likes: i64,
    pub author_id: Uuid,
    pub author_likes_before: i64,
    pub author_likes_after: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_vote: Option<VoteDirection>,
}

#[async_trait]
pub trait EngagementRepo: Send + Sync {
    /// Flips the caller's like on the target; `NotFound` when the target is gone.
    async fn toggle_like(&self, user_id: Uuid, target: LikeTarget)
    -> Result<LikeToggled, RepoError>;
    async fn is_liked(&self, user_id: Uuid, target: LikeTarget) -> Result<bool, RepoError>;
    async fn liked_among(
        &self,
        user_id: Uuid,
        kind: LikeTargetKind,
        ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError>;
    /// Content the user currently likes, most recent like first.
    async fn liked_content(&self, user_id: Uuid) -> Result<Vec<ContentRecord>, RepoError>;
    async fn cast_vote(
        &self,
        user_id: Uuid,
        comment_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteTally, RepoError>;
    async fn votes_among(
        &self,
        user_id: Uuid,
        comment_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VoteDirection>, RepoError>;
}

// ---------------------------------------------------------------- points

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishedCounts {
    pub stories: i64,
    pub videos: i64,
    pub shots: i64,
}

impl PublishedCounts {
    pub fn total(&self) -> i64 {
        self.stories + self.videos + self.shots
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub referral_count: i64,
    pub published: PublishedCounts,
    pub total_likes_received: i64,
}

impl ProfileCounts {
    pub fn points_profile(&self) -> PointsProfile {
        PointsProfile {
            referral_count: self.referral_count,
            published_content_count: self.published.total(),
            total_likes_received: self.total_likes_received,
        }
    }
}

#[async_trait]
pub trait PointsRepo: Send + Sync {
    async fn profile_counts(&self, user_id: Uuid) -> Result<ProfileCounts, RepoError>;
    async fn all_profile_counts(&self) -> Result<Vec<(UserRecord, ProfileCounts)>, RepoError>;
}

// ---------------------------------------------------------------- sessions

#[derive(Debug, Clone)]
pub struct NewSessionParams {
    pub user_id: Uuid,
    pub kind: SessionKind,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: NewSessionParams) -> Result<SessionRecord, RepoError>;
    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError>;
    /// Revokes an unrevoked session; returns false if it was already revoked.
    async fn revoke_session(&self, id: Uuid, at: OffsetDateTime) -> Result<bool, RepoError>;
    async fn touch_session(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError>;
}

// ---------------------------------------------------------------- mature content

#[async_trait]
pub trait MatureAckRepo: Send + Sync {
    async fn acknowledge(&self, user_id: Uuid, content_id: Uuid) -> Result<(), RepoError>;
    async fn acknowledged_among(
        &self,
        user_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError>;
}

// ---------------------------------------------------------------- audit

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError>;
}
