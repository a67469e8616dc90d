//! Shared request and response types for the Storyloft REST API.
//!
//! The server serializes these types and the client crate deserializes them,
//! so both sides agree on field names and enum spellings.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The three moderated, author-owned content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "content_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Story,
    Video,
    Shot,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Video => "video",
            Self::Shot => "shot",
        }
    }

    /// Plural path segment used by the REST routes (`/api/stories`).
    pub fn collection(self) -> &'static str {
        match self {
            Self::Story => "stories",
            Self::Video => "videos",
            Self::Shot => "shots",
        }
    }

    pub fn all() -> &'static [ContentKind] {
        &[Self::Story, Self::Video, Self::Shot]
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" | "stories" => Ok(Self::Story),
            "video" | "videos" => Ok(Self::Video),
            "shot" | "shots" => Ok(Self::Shot),
            _ => Err(()),
        }
    }
}

/// Moderation lifecycle shared by every content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "moderation_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for ModerationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "user_role", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "vote_direction", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// Targets a comment may be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "comment_target_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CommentTargetKind {
    Story,
    Chapter,
    Video,
    Shot,
}

impl CommentTargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Chapter => "chapter",
            Self::Video => "video",
            Self::Shot => "shot",
        }
    }
}

impl Display for CommentTargetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentTargetKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" => Ok(Self::Story),
            "chapter" => Ok(Self::Chapter),
            "video" => Ok(Self::Video),
            "shot" => Ok(Self::Shot),
            _ => Err(()),
        }
    }
}

/// Targets that carry a like counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "like_target_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LikeTargetKind {
    Story,
    Video,
    Shot,
    Comment,
}

impl LikeTargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Video => "video",
            Self::Shot => "shot",
            Self::Comment => "comment",
        }
    }

    pub fn content_kind(self) -> Option<ContentKind> {
        match self {
            Self::Story => Some(ContentKind::Story),
            Self::Video => Some(ContentKind::Video),
            Self::Shot => Some(ContentKind::Shot),
            Self::Comment => None,
        }
    }
}

impl From<ContentKind> for LikeTargetKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Story => Self::Story,
            ContentKind::Video => Self::Video,
            ContentKind::Shot => Self::Shot,
        }
    }
}

// -------- Auth --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogoutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub anonymous_name: String,
    pub role: UserRole,
    pub referral_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: UserView,
    pub tokens: TokenResponse,
    /// Whether the supplied referral code matched an existing user.
    pub referral_applied: bool,
}

// -------- Content --------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCreateRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mature_content: bool,
    /// Submit for review right away instead of saving a draft.
    #[serde(default)]
    pub submit: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mature_content: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentView {
    pub id: Uuid,
    pub kind: ContentKind,
    pub author_id: Uuid,
    pub author_anonymous_name: String,
    pub title: String,
    pub body: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub mature_content: bool,
    /// True when the item is mature and the viewer has not acknowledged it yet.
    pub requires_acknowledgement: bool,
    pub status: ModerationStatus,
    pub rejection_reason: Option<String>,
    pub likes_count: i64,
    pub views_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentListResponse {
    pub items: Vec<ContentView>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub share_link: String,
}

// -------- Chapters --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterCreateRequest {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<i32>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterView {
    pub id: Uuid,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub title: String,
    pub content: String,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

// -------- Comments --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreateRequest {
    pub target_kind: CommentTargetKind,
    pub target_id: Uuid,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentUpdateRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub target_kind: CommentTargetKind,
    pub target_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub anonymous_name: String,
    pub content: String,
    pub depth: u8,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub likes: i64,
    pub is_liked: bool,
    pub my_vote: Option<VoteDirection>,
    pub selected_text: Option<String>,
    pub text_position: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub replies: Vec<CommentView>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteRequest {
    pub vote: VoteDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub user_vote: Option<VoteDirection>,
}

// -------- Engagement --------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub total_likes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedResponse {
    pub liked: bool,
}

// -------- Points & referrals --------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub anonymous_name: String,
    pub points: i64,
    pub stories_count: i64,
    pub videos_count: i64,
    pub shots_count: i64,
    pub referral_count: i64,
    pub total_likes_received: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub referral_points: i64,
    pub content_points: i64,
    pub like_points: i64,
    pub total_points: i64,
    pub likes_until_next_point: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralInfo {
    pub referral_code: String,
    pub referral_count: i64,
    pub referral_link: String,
    pub points_from_referrals: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub anonymous_name: String,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

// -------- Admin & monitoring --------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: u64,
    pub draft: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub stories: StatusCounts,
    pub videos: StatusCounts,
    pub shots: StatusCounts,
    pub registered_users: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntryView {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub payload_text: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub count: u64,
    pub avg_duration: f64,
    pub errors: u64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowEndpoint {
    pub endpoint: String,
    pub avg_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActiveUsers {
    pub date: String,
    pub users: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub status_codes: BTreeMap<String, u64>,
    pub top_endpoints: Vec<EndpointStats>,
    pub slowest_endpoints: Vec<SlowEndpoint>,
    pub daily_active_users: u64,
    pub total_unique_users: u64,
    pub total_registered_users: u64,
    pub dau_history: Vec<DailyActiveUsers>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorsResponse {
    pub errors: Vec<ErrorEntry>,
}

// -------- Errors --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_accepts_singular_and_plural_segments() {
        assert_eq!("stories".parse::<ContentKind>(), Ok(ContentKind::Story));
        assert_eq!("shot".parse::<ContentKind>(), Ok(ContentKind::Shot));
        assert!("podcasts".parse::<ContentKind>().is_err());
    }

    #[test]
    fn comment_target_kind_displays_its_path_segment() {
        for kind in ["story", "chapter", "video", "shot"] {
            let parsed: CommentTargetKind = kind.parse().expect("known kind");
            assert_eq!(parsed.to_string(), kind);
        }
    }

    #[test]
    fn like_response_omits_missing_points() {
        let body = serde_json::to_value(LikeResponse {
            liked: true,
            total_likes: 4,
            points_earned: None,
        })
        .expect("serialize");
        assert_eq!(body, serde_json::json!({ "liked": true, "total_likes": 4 }));
    }

    #[test]
    fn vote_request_uses_lowercase_directions() {
        let request: VoteRequest = serde_json::from_str(r#"{"vote":"down"}"#).expect("parse");
        assert_eq!(request.vote, VoteDirection::Down);
    }
}
