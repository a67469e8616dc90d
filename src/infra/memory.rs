//! In-process repository implementations.
//!
//! All state sits behind one async mutex, so each trait call is a single
//! critical section and read-then-write operations stay atomic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use storyloft_api_types::StatusCounts;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    AuditRepo, ChaptersRepo, CommentsRepo, ContentFilter, ContentRepo, ContentScope,
    EngagementRepo, Guarded, LikeToggled, MAX_CHAPTER_NUMBER, MatureAckRepo, NewChapterParams, NewCommentParams,
    NewContentParams, NewSessionParams, NewUserParams, PointsRepo, ProfileCounts,
    PublishedCounts, RegisteredUser, RepoError, SessionsRepo, UpdateChapterParams,
    UpdateContentParams, UsersRepo, VoteTally,
};
use crate::domain::engagement::{resolve_like, resolve_vote};
use crate::domain::entities::{
    AuditLogRecord, ChapterRecord, CommentRecord, ContentRecord, SessionRecord, UserRecord,
};
use crate::domain::moderation::{ReasonUpdate, StatusChange};
use crate::domain::types::{
    CommentTarget, ContentKind, LikeTarget, LikeTargetKind, ModerationStatus, UserRole,
    VoteDirection,
};

const USERNAME_KEY: &str = "users_username_key";
const REFERRAL_CODE_KEY: &str = "users_referral_code_key";
const CHAPTER_NUMBER_KEY: &str = "chapters_story_id_chapter_number_key";
const SESSION_PREFIX_KEY: &str = "sessions_prefix_key";

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    content: HashMap<Uuid, ContentRecord>,
    chapters: HashMap<Uuid, ChapterRecord>,
    comments: HashMap<Uuid, CommentRecord>,
    /// Active likes with the time they were given.
    likes: HashMap<(Uuid, LikeTarget), OffsetDateTime>,
    votes: HashMap<(Uuid, Uuid), VoteDirection>,
    sessions: HashMap<Uuid, SessionRecord>,
    acks: HashSet<(Uuid, Uuid)>,
    audit: Vec<AuditLogRecord>,
}

impl State {
    fn content_of(&self, kind: ContentKind, id: Uuid) -> Option<&ContentRecord> {
        self.content.get(&id).filter(|record| record.kind == kind)
    }

    fn likes_received(&self, user_id: Uuid) -> i64 {
        let on_content: i64 = self
            .content
            .values()
            .filter(|record| record.author_id == user_id)
            .map(|record| record.likes_count)
            .sum();
        let on_comments: i64 = self
            .comments
            .values()
            .filter(|comment| comment.user_id == user_id)
            .map(|comment| comment.likes_count)
            .sum();
        on_content + on_comments
    }

    fn profile_counts(&self, user: &UserRecord) -> ProfileCounts {
        let mut published = PublishedCounts::default();
        for record in self
            .content
            .values()
            .filter(|record| record.author_id == user.id && record.published_at.is_some())
        {
            match record.kind {
                ContentKind::Story => published.stories += 1,
                ContentKind::Video => published.videos += 1,
                ContentKind::Shot => published.shots += 1,
            }
        }

        ProfileCounts {
            referral_count: user.referral_count,
            published,
            total_likes_received: self.likes_received(user.id),
        }
    }

    /// Removes comments and everything hanging off them.
    fn purge_comments(&mut self, ids: &HashSet<Uuid>) -> u64 {
        let before = self.comments.len();
        self.comments.retain(|id, _| !ids.contains(id));
        self.votes.retain(|(_, comment_id), _| !ids.contains(comment_id));
        self.likes.retain(|(_, target), _| {
            !(target.kind == LikeTargetKind::Comment && ids.contains(&target.id))
        });
        (before - self.comments.len()) as u64
    }

    fn comments_on(&self, targets: &HashSet<CommentTarget>) -> HashSet<Uuid> {
        self.comments
            .values()
            .filter(|comment| targets.contains(&comment.target))
            .map(|comment| comment.id)
            .collect()
    }

    fn subtree(&self, root: Uuid) -> HashSet<Uuid> {
        let mut found = HashSet::from([root]);
        let mut frontier = vec![root];
        while let Some(parent) = frontier.pop() {
            for comment in self.comments.values() {
                if comment.parent_id == Some(parent) && found.insert(comment.id) {
                    frontier.push(comment.id);
                }
            }
        }
        found
    }
}

/// Repository set kept entirely in memory. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct MemoryRepositories {
    state: Arc<Mutex<State>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_chapter_number(taken: &HashSet<i32>) -> Result<i32, RepoError> {
    taken
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .filter(|next| *next <= MAX_CHAPTER_NUMBER)
        .ok_or_else(|| RepoError::InvalidInput {
            message: format!("story already uses chapter_number {MAX_CHAPTER_NUMBER}"),
        })
}

fn comment_target_for(kind: ContentKind, id: Uuid) -> CommentTarget {
    match kind {
        ContentKind::Story => CommentTarget::Story(id),
        ContentKind::Video => CommentTarget::Video(id),
        ContentKind::Shot => CommentTarget::Shot(id),
    }
}

fn matches_filter(record: &ContentRecord, filter: &ContentFilter) -> bool {
    let search_ok = filter.search.as_deref().is_none_or(|needle| {
        let needle = needle.to_lowercase();
        record.title.to_lowercase().contains(&needle)
            || record.body.to_lowercase().contains(&needle)
    });
    let tag_ok = filter.tag.as_deref().is_none_or(|tag| {
        record
            .tags
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(tag))
    });
    search_ok && tag_ok
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn register_user(&self, params: NewUserParams) -> Result<RegisteredUser, RepoError> {
        let mut state = self.state.lock().await;

        if state
            .users
            .values()
            .any(|user| user.username.eq_ignore_ascii_case(&params.username))
        {
            return Err(RepoError::duplicate(USERNAME_KEY));
        }
        if state
            .users
            .values()
            .any(|user| user.referral_code == params.referral_code)
        {
            return Err(RepoError::duplicate(REFERRAL_CODE_KEY));
        }

        let referrer = params.referred_with.as_deref().and_then(|code| {
            state
                .users
                .values()
                .find(|user| user.referral_code == code)
                .map(|user| user.id)
        });
        if let Some(referrer_id) = referrer
            && let Some(referrer) = state.users.get_mut(&referrer_id)
        {
            referrer.referral_count += 1;
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            anonymous_name: params.anonymous_name,
            role: params.role,
            referral_code: params.referral_code,
            referral_count: 0,
            referred_by: referrer,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.insert(user.id, user.clone());

        Ok(RegisteredUser { user, referrer })
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|user| (*id, user.clone())))
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        let user = state.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        Ok(self.state.lock().await.users.len() as u64)
    }
}

#[async_trait]
impl ContentRepo for MemoryRepositories {
    async fn create_content(&self, params: NewContentParams) -> Result<ContentRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = ContentRecord {
            id: Uuid::new_v4(),
            kind: params.kind,
            author_id: params.author_id,
            title: params.title,
            body: params.body,
            media_url: params.media_url,
            thumbnail_url: params.thumbnail_url,
            tags: params.tags,
            mature_content: params.mature_content,
            status: params.status,
            rejection_reason: None,
            likes_count: 0,
            views_count: 0,
            created_at: now,
            updated_at: now,
            published_at: params.published_at,
        };
        self.state
            .lock()
            .await
            .content
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, RepoError> {
        Ok(self.state.lock().await.content_of(kind, id).cloned())
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<Guarded<ContentRecord>, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .content
            .get_mut(&params.id)
            .filter(|record| record.kind == params.kind)
            .ok_or(RepoError::NotFound)?;

        if !params.expected.contains(&record.status) {
            return Ok(Guarded::Stale(record.status));
        }

        record.title = params.title;
        record.body = params.body;
        record.media_url = params.media_url;
        record.thumbnail_url = params.thumbnail_url;
        record.tags = params.tags;
        record.mature_content = params.mature_content;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Guarded::Applied(record.clone()))
    }

    async fn transition_status(
        &self,
        kind: ContentKind,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Guarded<ContentRecord>, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .content
            .get_mut(&id)
            .filter(|record| record.kind == kind)
            .ok_or(RepoError::NotFound)?;

        if !change.expected.contains(&record.status) {
            return Ok(Guarded::Stale(record.status));
        }

        record.status = change.to;
        // published_at is write-once.
        if record.published_at.is_none() {
            record.published_at = change.published_at;
        }
        match change.reason {
            ReasonUpdate::Keep => {}
            ReasonUpdate::Clear => record.rejection_reason = None,
            ReasonUpdate::Set(reason) => record.rejection_reason = Some(reason),
        }
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Guarded::Applied(record.clone()))
    }

    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if state.content_of(kind, id).is_none() {
            return Err(RepoError::NotFound);
        }

        let mut targets = HashSet::from([comment_target_for(kind, id)]);
        if kind == ContentKind::Story {
            let chapter_ids: Vec<Uuid> = state
                .chapters
                .values()
                .filter(|chapter| chapter.story_id == id)
                .map(|chapter| chapter.id)
                .collect();
            for chapter_id in chapter_ids {
                state.chapters.remove(&chapter_id);
                targets.insert(CommentTarget::Chapter(chapter_id));
            }
        }

        let comment_ids = state.comments_on(&targets);
        state.purge_comments(&comment_ids);

        let like_target = LikeTarget::content(kind, id);
        state.likes.retain(|(_, target), _| *target != like_target);
        state.acks.retain(|(_, content_id)| *content_id != id);
        state.content.remove(&id);
        Ok(())
    }

    async fn list_content(
        &self,
        kind: ContentKind,
        scope: ContentScope,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<ContentRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut items: Vec<ContentRecord> = state
            .content
            .values()
            .filter(|record| record.kind == kind)
            .filter(|record| match scope {
                ContentScope::Public => record.status == ModerationStatus::Approved,
                ContentScope::Author {
                    author_id,
                    include_unapproved,
                } => {
                    record.author_id == author_id
                        && (include_unapproved || record.status == ModerationStatus::Approved)
                }
                ContentScope::Pending => record.status == ModerationStatus::Pending,
            })
            .filter(|record| matches_filter(record, filter))
            .cloned()
            .collect();

        match scope {
            ContentScope::Public => items.sort_by(|a, b| {
                b.published_at
                    .cmp(&a.published_at)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
            ContentScope::Author { .. } => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ContentScope::Pending => items.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
        }

        Ok(Page::from_slice(items, page))
    }

    async fn count_by_status(&self, kind: ContentKind) -> Result<StatusCounts, RepoError> {
        let state = self.state.lock().await;
        let mut counts = StatusCounts::default();
        for record in state.content.values().filter(|record| record.kind == kind) {
            counts.total += 1;
            match record.status {
                ModerationStatus::Draft => counts.draft += 1,
                ModerationStatus::Pending => counts.pending += 1,
                ModerationStatus::Approved => counts.approved += 1,
                ModerationStatus::Rejected => counts.rejected += 1,
            }
        }
        Ok(counts)
    }

    async fn increment_views(&self, kind: ContentKind, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .content
            .get_mut(&id)
            .filter(|record| record.kind == kind)
            .ok_or(RepoError::NotFound)?;
        record.views_count += 1;
        Ok(())
    }
}

#[async_trait]
impl ChaptersRepo for MemoryRepositories {
    async fn create_chapter(&self, params: NewChapterParams) -> Result<ChapterRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.content_of(ContentKind::Story, params.story_id).is_none() {
            return Err(RepoError::NotFound);
        }

        let numbers: HashSet<i32> = state
            .chapters
            .values()
            .filter(|chapter| chapter.story_id == params.story_id)
            .map(|chapter| chapter.chapter_number)
            .collect();
        let chapter_number = match params.chapter_number {
            Some(number) if numbers.contains(&number) => {
                return Err(RepoError::duplicate(CHAPTER_NUMBER_KEY));
            }
            Some(number) => number,
            None => next_chapter_number(&numbers)?,
        };

        let now = OffsetDateTime::now_utc();
        let chapter = ChapterRecord {
            id: Uuid::new_v4(),
            story_id: params.story_id,
            chapter_number,
            title: params.title,
            content: params.content,
            published: params.published,
            created_at: now,
            updated_at: now,
        };
        state.chapters.insert(chapter.id, chapter.clone());
        Ok(chapter)
    }

    async fn find_chapter(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepoError> {
        Ok(self.state.lock().await.chapters.get(&id).cloned())
    }

    async fn list_chapters(&self, story_id: Uuid) -> Result<Vec<ChapterRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut chapters: Vec<ChapterRecord> = state
            .chapters
            .values()
            .filter(|chapter| chapter.story_id == story_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|chapter| chapter.chapter_number);
        Ok(chapters)
    }

    async fn update_chapter(
        &self,
        params: UpdateChapterParams,
    ) -> Result<ChapterRecord, RepoError> {
        let mut state = self.state.lock().await;
        let story_id = state
            .chapters
            .get(&params.id)
            .map(|chapter| chapter.story_id)
            .ok_or(RepoError::NotFound)?;

        let taken = state.chapters.values().any(|chapter| {
            chapter.story_id == story_id
                && chapter.id != params.id
                && chapter.chapter_number == params.chapter_number
        });
        if taken {
            return Err(RepoError::duplicate(CHAPTER_NUMBER_KEY));
        }

        let chapter = state
            .chapters
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        chapter.chapter_number = params.chapter_number;
        chapter.title = params.title;
        chapter.content = params.content;
        chapter.updated_at = OffsetDateTime::now_utc();
        Ok(chapter.clone())
    }

    async fn set_chapter_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<ChapterRecord, RepoError> {
        let mut state = self.state.lock().await;
        let chapter = state.chapters.get_mut(&id).ok_or(RepoError::NotFound)?;
        chapter.published = published;
        chapter.updated_at = OffsetDateTime::now_utc();
        Ok(chapter.clone())
    }

    async fn delete_chapter(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if state.chapters.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        let comment_ids = state.comments_on(&HashSet::from([CommentTarget::Chapter(id)]));
        state.purge_comments(&comment_ids);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        if let Some(parent_id) = params.parent_id
            && !state.comments.contains_key(&parent_id)
        {
            return Err(RepoError::NotFound);
        }

        let now = OffsetDateTime::now_utc();
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            target: params.target,
            parent_id: params.parent_id,
            user_id: params.user_id,
            content: params.content,
            depth: params.depth,
            upvotes: 0,
            downvotes: 0,
            likes_count: 0,
            selected_text: params.selected_text,
            text_position: params.text_position,
            created_at: now,
            updated_at: now,
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.state.lock().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, target: CommentTarget) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut comments: Vec<CommentRecord> = state
            .comments
            .values()
            .filter(|comment| comment.target == target)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let comment = state.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        comment.content = content;
        comment.updated_at = OffsetDateTime::now_utc();
        Ok(comment.clone())
    }

    async fn delete_comment_subtree(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        if !state.comments.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        let ids = state.subtree(id);
        Ok(state.purge_comments(&ids))
    }
}

#[async_trait]
impl EngagementRepo for MemoryRepositories {
    async fn toggle_like(
        &self,
        user_id: Uuid,
        target: LikeTarget,
    ) -> Result<LikeToggled, RepoError> {
        let mut state = self.state.lock().await;

        let author_id = match target.kind.content_kind() {
            Some(kind) => state.content_of(kind, target.id).map(|record| record.author_id),
            None => state.comments.get(&target.id).map(|comment| comment.user_id),
        }
        .ok_or(RepoError::NotFound)?;

        let key = (user_id, target);
        let author_likes_before = state.likes_received(author_id);
        let change = resolve_like(state.likes.contains_key(&key));
        if change.liked {
            state.likes.insert(key, OffsetDateTime::now_utc());
        } else {
            state.likes.remove(&key);
        }

        let total_likes = match target.kind.content_kind() {
            Some(_) => {
                let record = state
                    .content
                    .get_mut(&target.id)
                    .ok_or(RepoError::NotFound)?;
                record.likes_count = (record.likes_count + change.delta).max(0);
                record.likes_count
            }
            None => {
                let comment = state
                    .comments
                    .get_mut(&target.id)
                    .ok_or(RepoError::NotFound)?;
                comment.likes_count = (comment.likes_count + change.delta).max(0);
                comment.likes_count
            }
        };

        Ok(LikeToggled {
            liked: change.liked,
            total_likes,
            author_id,
            author_likes_before,
            author_likes_after: state.likes_received(author_id),
        })
    }

    async fn is_liked(&self, user_id: Uuid, target: LikeTarget) -> Result<bool, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .likes
            .contains_key(&(user_id, target)))
    }

    async fn liked_among(
        &self,
        user_id: Uuid,
        kind: LikeTargetKind,
        ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| state.likes.contains_key(&(user_id, LikeTarget { kind, id: *id })))
            .collect())
    }

    async fn liked_content(&self, user_id: Uuid) -> Result<Vec<ContentRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut liked: Vec<(OffsetDateTime, ContentRecord)> = state
            .likes
            .iter()
            .filter(|((liker, _), _)| *liker == user_id)
            .filter_map(|((_, target), liked_at)| {
                let kind = target.kind.content_kind()?;
                state
                    .content_of(kind, target.id)
                    .map(|record| (*liked_at, record.clone()))
            })
            .collect();
        liked.sort_by(|(a, _), (b, _)| b.cmp(a));
        Ok(liked.into_iter().map(|(_, record)| record).collect())
    }

    async fn cast_vote(
        &self,
        user_id: Uuid,
        comment_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteTally, RepoError> {
        let mut state = self.state.lock().await;
        if !state.comments.contains_key(&comment_id) {
            return Err(RepoError::NotFound);
        }

        let key = (user_id, comment_id);
        let change = resolve_vote(state.votes.get(&key).copied(), direction);
        match change.vote {
            Some(vote) => state.votes.insert(key, vote),
            None => state.votes.remove(&key),
        };

        let comment = state
            .comments
            .get_mut(&comment_id)
            .ok_or(RepoError::NotFound)?;
        comment.upvotes += change.up_delta;
        comment.downvotes += change.down_delta;

        Ok(VoteTally {
            upvotes: comment.upvotes,
            downvotes: comment.downvotes,
            user_vote: change.vote,
        })
    }

    async fn votes_among(
        &self,
        user_id: Uuid,
        comment_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VoteDirection>, RepoError> {
        let state = self.state.lock().await;
        Ok(comment_ids
            .iter()
            .filter_map(|id| state.votes.get(&(user_id, *id)).map(|vote| (*id, *vote)))
            .collect())
    }
}

#[async_trait]
impl PointsRepo for MemoryRepositories {
    async fn profile_counts(&self, user_id: Uuid) -> Result<ProfileCounts, RepoError> {
        let state = self.state.lock().await;
        let user = state.users.get(&user_id).ok_or(RepoError::NotFound)?;
        Ok(state.profile_counts(user))
    }

    async fn all_profile_counts(&self) -> Result<Vec<(UserRecord, ProfileCounts)>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .map(|user| (user.clone(), state.profile_counts(user)))
            .collect())
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepositories {
    async fn create_session(&self, params: NewSessionParams) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .sessions
            .values()
            .any(|session| session.prefix == params.prefix)
        {
            return Err(RepoError::duplicate(SESSION_PREFIX_KEY));
        }

        let session = SessionRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            kind: params.kind,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            expires_at: params.expires_at,
            revoked_at: None,
            last_used_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn revoke_session(&self, id: Uuid, at: OffsetDateTime) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let session = state.sessions.get_mut(&id).ok_or(RepoError::NotFound)?;
        if session.revoked_at.is_some() {
            return Ok(false);
        }
        session.revoked_at = Some(at);
        Ok(true)
    }

    async fn touch_session(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if let Some(session) = state.sessions.get_mut(&id) {
            session.last_used_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl MatureAckRepo for MemoryRepositories {
    async fn acknowledge(&self, user_id: Uuid, content_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if !state.content.contains_key(&content_id) {
            return Err(RepoError::NotFound);
        }
        state.acks.insert((user_id, content_id));
        Ok(())
    }

    async fn acknowledged_among(
        &self,
        user_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError> {
        let state = self.state.lock().await;
        Ok(content_ids
            .iter()
            .copied()
            .filter(|id| state.acks.contains(&(user_id, *id)))
            .collect())
    }
}

#[async_trait]
impl AuditRepo for MemoryRepositories {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError> {
        self.state.lock().await.audit.push(record);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
