//! Moderation workflow shared by every content kind.
//!
//! ```text
//! draft ──submit──▶ pending ──approve──▶ approved
//!                     │  ▲
//!              reject │  │ resubmit
//!                     ▼  │
//!                   rejected
//! ```
//!
//! The functions here only plan a transition. The store applies the plan with
//! a compare-and-set on the status the plan was computed from, so two
//! concurrent decisions cannot both succeed.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::ContentRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{ContentKind, ModerationStatus, UserRole};

/// Capability every moderated item exposes to the workflow.
pub trait Moderated {
    fn status(&self) -> ModerationStatus;
    fn author_id(&self) -> Uuid;
    fn published_at(&self) -> Option<OffsetDateTime>;
    /// Fails when the item lacks what a reviewer needs to see.
    fn check_reviewable(&self) -> Result<(), DomainError>;
}

impl Moderated for ContentRecord {
    fn status(&self) -> ModerationStatus {
        self.status
    }

    fn author_id(&self) -> Uuid {
        self.author_id
    }

    fn published_at(&self) -> Option<OffsetDateTime> {
        self.published_at
    }

    fn check_reviewable(&self) -> Result<(), DomainError> {
        Submission::new(self, None).check_reviewable()
    }
}

/// A content item about to be submitted, with the first chapter's text
/// standing in for an empty story body.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    record: &'a ContentRecord,
    first_chapter: Option<&'a str>,
}

impl<'a> Submission<'a> {
    pub fn new(record: &'a ContentRecord, first_chapter: Option<&'a str>) -> Self {
        Self {
            record,
            first_chapter,
        }
    }
}

impl Moderated for Submission<'_> {
    fn status(&self) -> ModerationStatus {
        self.record.status
    }

    fn author_id(&self) -> Uuid {
        self.record.author_id
    }

    fn published_at(&self) -> Option<OffsetDateTime> {
        self.record.published_at
    }

    fn check_reviewable(&self) -> Result<(), DomainError> {
        let record = self.record;
        if record.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }

        match record.kind {
            ContentKind::Story => {
                let has_body = !record.body.trim().is_empty()
                    || self
                        .first_chapter
                        .is_some_and(|content| !content.trim().is_empty());
                if !has_body {
                    return Err(DomainError::validation(
                        "story needs body text or a first chapter before review",
                    ));
                }
            }
            ContentKind::Video | ContentKind::Shot => {
                let has_media = record
                    .media_url
                    .as_deref()
                    .is_some_and(|url| !url.trim().is_empty());
                if !has_media {
                    return Err(DomainError::validation(format!(
                        "{} needs a media_url before review",
                        record.kind
                    )));
                }
            }
        }
        Ok(())
    }
}

/// What happens to `rejection_reason` when a transition is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonUpdate {
    Keep,
    Clear,
    Set(String),
}

/// A planned status change, applied only if the stored status is still one
/// of `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub expected: Vec<ModerationStatus>,
    pub to: ModerationStatus,
    pub published_at: Option<OffsetDateTime>,
    pub reason: ReasonUpdate,
}

pub const SUBMITTABLE: [ModerationStatus; 2] = [ModerationStatus::Draft, ModerationStatus::Rejected];

pub fn plan_submit<M: Moderated>(item: &M) -> Result<StatusChange, DomainError> {
    if !SUBMITTABLE.contains(&item.status()) {
        return Err(DomainError::conflict(format!(
            "cannot submit an item that is {}",
            item.status()
        )));
    }
    item.check_reviewable()?;

    Ok(StatusChange {
        expected: SUBMITTABLE.to_vec(),
        to: ModerationStatus::Pending,
        published_at: item.published_at(),
        reason: ReasonUpdate::Keep,
    })
}

pub fn plan_approve<M: Moderated>(
    item: &M,
    now: OffsetDateTime,
) -> Result<StatusChange, DomainError> {
    ensure_pending(item)?;
    Ok(StatusChange {
        expected: vec![ModerationStatus::Pending],
        to: ModerationStatus::Approved,
        published_at: Some(item.published_at().unwrap_or(now)),
        reason: ReasonUpdate::Clear,
    })
}

pub fn plan_reject<M: Moderated>(item: &M, reason: &str) -> Result<StatusChange, DomainError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("rejection_reason must not be empty"));
    }
    ensure_pending(item)?;
    Ok(StatusChange {
        expected: vec![ModerationStatus::Pending],
        to: ModerationStatus::Rejected,
        published_at: item.published_at(),
        reason: ReasonUpdate::Set(reason.to_string()),
    })
}

fn ensure_pending<M: Moderated>(item: &M) -> Result<(), DomainError> {
    if item.status() == ModerationStatus::Pending {
        Ok(())
    } else {
        Err(DomainError::conflict("not pending"))
    }
}

/// Who is looking at an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Viewer {
    pub fn is_admin(self) -> bool {
        self.role == UserRole::Admin
    }
}

pub fn is_owner<M: Moderated>(item: &M, viewer: Option<Viewer>) -> bool {
    viewer.is_some_and(|viewer| viewer.user_id == item.author_id())
}

/// Approved items are public; everything else only to the author and admins.
pub fn can_view<M: Moderated>(item: &M, viewer: Option<Viewer>) -> bool {
    item.status() == ModerationStatus::Approved
        || is_owner(item, viewer)
        || viewer.is_some_and(Viewer::is_admin)
}

pub fn ensure_owner<M: Moderated>(item: &M, viewer: Viewer) -> Result<(), DomainError> {
    if item.author_id() == viewer.user_id {
        Ok(())
    } else {
        Err(DomainError::forbidden("only the author can change this item"))
    }
}

pub fn ensure_can_delete<M: Moderated>(item: &M, viewer: Viewer) -> Result<(), DomainError> {
    if viewer.is_admin() {
        return Ok(());
    }
    ensure_owner(item, viewer)
}

/// Edits are limited to the author, and only while the item is not under
/// review or live.
pub fn ensure_editable<M: Moderated>(item: &M, viewer: Viewer) -> Result<(), DomainError> {
    ensure_owner(item, viewer)?;
    if SUBMITTABLE.contains(&item.status()) {
        Ok(())
    } else {
        Err(DomainError::conflict(format!(
            "cannot edit an item that is {}",
            item.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ContentKind, status: ModerationStatus) -> ContentRecord {
        ContentRecord {
            id: Uuid::new_v4(),
            kind,
            author_id: Uuid::from_u128(7),
            title: "Night bus".to_string(),
            body: "It was late.".to_string(),
            media_url: Some("https://cdn.example/v.mp4".to_string()),
            thumbnail_url: None,
            tags: Vec::new(),
            mature_content: false,
            status,
            rejection_reason: None,
            likes_count: 0,
            views_count: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            published_at: None,
        }
    }

    fn author() -> Viewer {
        Viewer {
            user_id: Uuid::from_u128(7),
            role: UserRole::User,
        }
    }

    #[test]
    fn draft_cannot_be_approved_directly() {
        let item = record(ContentKind::Story, ModerationStatus::Draft);
        let err = plan_approve(&item, OffsetDateTime::UNIX_EPOCH).expect_err("not pending");
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn every_path_to_approved_passes_pending() {
        let statuses = [
            ModerationStatus::Draft,
            ModerationStatus::Pending,
            ModerationStatus::Approved,
            ModerationStatus::Rejected,
        ];
        for status in statuses {
            let item = record(ContentKind::Video, status);
            let planned = plan_approve(&item, OffsetDateTime::UNIX_EPOCH);
            assert_eq!(planned.is_ok(), status == ModerationStatus::Pending);
            if let Ok(change) = planned {
                assert_eq!(change.expected, vec![ModerationStatus::Pending]);
            }
        }
    }

    #[test]
    fn approve_keeps_first_publication_time() {
        let mut item = record(ContentKind::Shot, ModerationStatus::Pending);
        let first = OffsetDateTime::UNIX_EPOCH + time::Duration::days(3);
        item.published_at = Some(first);

        let change =
            plan_approve(&item, first + time::Duration::days(10)).expect("pending item approves");
        assert_eq!(change.published_at, Some(first));
        assert_eq!(change.reason, ReasonUpdate::Clear);
    }

    #[test]
    fn reject_requires_reason() {
        let item = record(ContentKind::Story, ModerationStatus::Pending);
        let err = plan_reject(&item, "   ").expect_err("blank reason");
        assert!(matches!(err, DomainError::Validation { .. }));

        let change = plan_reject(&item, "  off topic ").expect("reason given");
        assert_eq!(change.reason, ReasonUpdate::Set("off topic".to_string()));
    }

    #[test]
    fn resubmission_keeps_previous_reason() {
        let mut item = record(ContentKind::Story, ModerationStatus::Rejected);
        item.rejection_reason = Some("too short".to_string());
        let change = plan_submit(&item).expect("rejected items resubmit");
        assert_eq!(change.to, ModerationStatus::Pending);
        assert_eq!(change.reason, ReasonUpdate::Keep);
    }

    #[test]
    fn story_body_may_come_from_first_chapter() {
        let mut item = record(ContentKind::Story, ModerationStatus::Draft);
        item.body = "  ".to_string();

        assert!(plan_submit(&item).is_err());
        assert!(plan_submit(&Submission::new(&item, Some("Chapter one text"))).is_ok());
    }

    #[test]
    fn media_kinds_need_a_url() {
        let mut item = record(ContentKind::Shot, ModerationStatus::Draft);
        item.media_url = None;
        let err = plan_submit(&item).expect_err("missing media");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn pending_items_are_hidden_from_strangers() {
        let item = record(ContentKind::Story, ModerationStatus::Pending);
        let stranger = Viewer {
            user_id: Uuid::from_u128(99),
            role: UserRole::User,
        };
        let admin = Viewer {
            user_id: Uuid::from_u128(100),
            role: UserRole::Admin,
        };

        assert!(!can_view(&item, None));
        assert!(!can_view(&item, Some(stranger)));
        assert!(can_view(&item, Some(author())));
        assert!(can_view(&item, Some(admin)));
    }

    #[test]
    fn edits_are_blocked_while_pending() {
        let item = record(ContentKind::Story, ModerationStatus::Pending);
        let err = ensure_editable(&item, author()).expect_err("pending");
        assert!(matches!(err, DomainError::Conflict { .. }));
    }
}
