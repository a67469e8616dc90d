use serde::Serialize;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::entities::ContentRecord;
use crate::domain::types::{ContentKind, ModerationStatus};

#[derive(Debug, Clone, Default)]
pub struct CreateContentCommand {
    pub title: String,
    pub body: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub mature_content: bool,
    /// Go straight to the review queue instead of staying a draft.
    pub submit: bool,
}

/// Partial edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateContentCommand {
    pub title: Option<String>,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub mature_content: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    pub fn from_request(approved: bool, rejection_reason: Option<String>) -> Self {
        if approved {
            Self::Approve
        } else {
            Self::Reject {
                reason: rejection_reason.unwrap_or_default(),
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject { .. } => "rejected",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListContentQuery {
    pub page: PageRequest,
    pub search: Option<String>,
    pub tag: Option<String>,
}

/// Service-level knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct ContentOptions {
    pub submit_on_create: bool,
    pub public_base_url: String,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            submit_on_create: false,
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// A content record as one viewer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub record: ContentRecord,
    pub author_anonymous_name: String,
    pub requires_acknowledgement: bool,
}

/// Audit payload describing an item at the time of an admin action.
#[derive(Debug, Clone, Serialize)]
pub struct ContentSnapshot<'a> {
    pub kind: ContentKind,
    pub id: Uuid,
    pub title: &'a str,
    pub status: ModerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<&'a str>,
}

impl<'a> ContentSnapshot<'a> {
    pub fn of(record: &'a ContentRecord) -> Self {
        Self {
            kind: record.kind,
            id: record.id,
            title: &record.title,
            status: record.status,
            rejection_reason: record.rejection_reason.as_deref(),
        }
    }
}

pub(super) fn trimmed_opt(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
