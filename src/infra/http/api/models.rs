//! Conversions from service results to wire types.

use storyloft_api_types::{
    AuditEntryView, ChapterView, CommentView, ContentListResponse, ContentView, LikeResponse,
    RegisterResponse, UserView, VoteResponse,
};

use crate::application::accounts::Registration;
use crate::application::comments::CommentThread;
use crate::application::content::ContentItem;
use crate::application::engagement::LikeOutcome;
use crate::application::pagination::Page;
use crate::application::repos::VoteTally;
use crate::domain::entities::{AuditLogRecord, ChapterRecord, CommentRecord, UserRecord};

pub fn user_view(user: UserRecord) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        anonymous_name: user.anonymous_name,
        role: user.role,
        referral_code: user.referral_code,
        created_at: user.created_at,
    }
}

pub fn registration_view(registration: Registration) -> RegisterResponse {
    RegisterResponse {
        user: user_view(registration.user),
        tokens: registration.tokens.into(),
        referral_applied: registration.referral_applied,
    }
}

pub fn content_view(item: ContentItem) -> ContentView {
    let record = item.record;
    ContentView {
        id: record.id,
        kind: record.kind,
        author_id: record.author_id,
        author_anonymous_name: item.author_anonymous_name,
        title: record.title,
        body: record.body,
        media_url: record.media_url,
        thumbnail_url: record.thumbnail_url,
        tags: record.tags,
        mature_content: record.mature_content,
        requires_acknowledgement: item.requires_acknowledgement,
        status: record.status,
        rejection_reason: record.rejection_reason,
        likes_count: record.likes_count,
        views_count: record.views_count,
        created_at: record.created_at,
        updated_at: record.updated_at,
        published_at: record.published_at,
    }
}

pub fn content_list(page: Page<ContentItem>) -> ContentListResponse {
    ContentListResponse {
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        items: page.items.into_iter().map(content_view).collect(),
    }
}

pub fn chapter_view(chapter: ChapterRecord) -> ChapterView {
    ChapterView {
        id: chapter.id,
        story_id: chapter.story_id,
        chapter_number: chapter.chapter_number,
        title: chapter.title,
        content: chapter.content,
        published: chapter.published,
        created_at: chapter.created_at,
        updated_at: chapter.updated_at,
    }
}

pub fn comment_view(thread: CommentThread) -> CommentView {
    let score = thread.record.score();
    let record = thread.record;
    CommentView {
        id: record.id,
        target_kind: record.target.kind(),
        target_id: record.target.id(),
        parent_id: record.parent_id,
        user_id: record.user_id,
        anonymous_name: thread.anonymous_name,
        content: record.content,
        depth: record.depth,
        upvotes: record.upvotes,
        downvotes: record.downvotes,
        score,
        likes: record.likes_count,
        is_liked: thread.is_liked,
        my_vote: thread.my_vote,
        selected_text: record.selected_text,
        text_position: record.text_position,
        created_at: record.created_at,
        updated_at: record.updated_at,
        replies: thread.replies.into_iter().map(comment_view).collect(),
    }
}

/// A freshly written comment, shown to its author.
pub fn authored_comment_view(record: CommentRecord, anonymous_name: &str) -> CommentView {
    comment_view(CommentThread {
        record,
        anonymous_name: anonymous_name.to_string(),
        is_liked: false,
        my_vote: None,
        replies: Vec::new(),
    })
}

pub fn like_view(outcome: LikeOutcome) -> LikeResponse {
    LikeResponse {
        liked: outcome.liked,
        total_likes: outcome.total_likes,
        points_earned: outcome.points_earned,
    }
}

pub fn vote_view(tally: VoteTally) -> VoteResponse {
    VoteResponse {
        upvotes: tally.upvotes,
        downvotes: tally.downvotes,
        score: tally.upvotes - tally.downvotes,
        user_vote: tally.user_vote,
    }
}

pub fn audit_view(record: AuditLogRecord) -> AuditEntryView {
    AuditEntryView {
        id: record.id,
        actor: record.actor,
        action: record.action,
        entity_type: record.entity_type,
        entity_id: record.entity_id,
        payload_text: record.payload_text,
        created_at: record.created_at,
    }
}
