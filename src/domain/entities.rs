//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{
    CommentTarget, ContentKind, ModerationStatus, SessionKind, UserRole,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub anonymous_name: String,
    pub role: UserRole,
    pub referral_code: String,
    pub referral_count: i64,
    pub referred_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A story, video or shot. The three kinds share one record shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub kind: ContentKind,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub mature_content: bool,
    pub status: ModerationStatus,
    pub rejection_reason: Option<String>,
    pub likes_count: i64,
    pub views_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterRecord {
    pub id: Uuid,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRecord {
    pub id: Uuid,
    pub target: CommentTarget,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub content: String,
    pub depth: u8,
    pub upvotes: i64,
    pub downvotes: i64,
    pub likes_count: i64,
    pub selected_text: Option<String>,
    pub text_position: Option<i32>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CommentRecord {
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: SessionKind,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
    pub last_used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub payload_text: Option<String>,
    pub created_at: OffsetDateTime,
}
