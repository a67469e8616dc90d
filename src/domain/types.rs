//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use storyloft_api_types::{
    CommentTargetKind, ContentKind, LikeTargetKind, ModerationStatus, UserRole, VoteDirection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_kind", rename_all = "snake_case")]
pub enum SessionKind {
    Access,
    Refresh,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Access => "access",
            SessionKind::Refresh => "refresh",
        }
    }
}

/// The single item a comment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentTarget {
    Story(Uuid),
    Chapter(Uuid),
    Video(Uuid),
    Shot(Uuid),
}

impl CommentTarget {
    pub fn new(kind: CommentTargetKind, id: Uuid) -> Self {
        match kind {
            CommentTargetKind::Story => Self::Story(id),
            CommentTargetKind::Chapter => Self::Chapter(id),
            CommentTargetKind::Video => Self::Video(id),
            CommentTargetKind::Shot => Self::Shot(id),
        }
    }

    pub fn kind(self) -> CommentTargetKind {
        match self {
            Self::Story(_) => CommentTargetKind::Story,
            Self::Chapter(_) => CommentTargetKind::Chapter,
            Self::Video(_) => CommentTargetKind::Video,
            Self::Shot(_) => CommentTargetKind::Shot,
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            Self::Story(id) | Self::Chapter(id) | Self::Video(id) | Self::Shot(id) => id,
        }
    }

    /// The content item targeted directly; chapters resolve through their story.
    pub fn content(self) -> Option<(ContentKind, Uuid)> {
        match self {
            Self::Story(id) => Some((ContentKind::Story, id)),
            Self::Video(id) => Some((ContentKind::Video, id)),
            Self::Shot(id) => Some((ContentKind::Shot, id)),
            Self::Chapter(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LikeTarget {
    pub kind: LikeTargetKind,
    pub id: Uuid,
}

impl LikeTarget {
    pub fn content(kind: ContentKind, id: Uuid) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            kind: LikeTargetKind::Comment,
            id,
        }
    }
}
