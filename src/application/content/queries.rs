use std::collections::HashSet;

use storyloft_api_types::{DashboardResponse, StatusCounts};
use tracing::debug;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{ContentFilter, ContentScope};
use crate::application::sessions::Principal;
use crate::domain::entities::ContentRecord;
use crate::domain::moderation::is_owner;
use crate::domain::types::{ContentKind, ModerationStatus};

use super::service::ContentService;
use super::types::{ContentItem, ListContentQuery, trimmed_opt};

const UNKNOWN_AUTHOR: &str = "Anonymous";

impl ContentService {
    /// Reads one item. Approved items read by anyone but their author count
    /// as a view.
    pub async fn get(
        &self,
        kind: ContentKind,
        id: Uuid,
        viewer: Option<&Principal>,
    ) -> Result<ContentItem, ServiceError> {
        let mut record = self
            .load_visible(kind, id, viewer.map(Principal::viewer))
            .await?;

        if record.status == ModerationStatus::Approved
            && !is_owner(&record, viewer.map(Principal::viewer))
        {
            self.content.increment_views(kind, id).await?;
            record.views_count += 1;
        }

        let mut items = self.annotate(vec![record], viewer).await?;
        items
            .pop()
            .ok_or_else(|| ServiceError::Invariant("annotated item vanished".to_string()))
    }

    /// Annotates a record the caller just wrote, without counting a view.
    pub async fn present(
        &self,
        record: ContentRecord,
        viewer: &Principal,
    ) -> Result<ContentItem, ServiceError> {
        let mut items = self.annotate(vec![record], Some(viewer)).await?;
        items
            .pop()
            .ok_or_else(|| ServiceError::Invariant("annotated item vanished".to_string()))
    }

    pub async fn list_public(
        &self,
        kind: ContentKind,
        query: ListContentQuery,
        viewer: Option<&Principal>,
    ) -> Result<Page<ContentItem>, ServiceError> {
        let filter = ContentFilter {
            search: trimmed_opt(query.search),
            tag: trimmed_opt(query.tag),
        };
        let page = self
            .content
            .list_content(kind, ContentScope::Public, &filter, query.page)
            .await?;
        self.annotate_page(page, viewer).await
    }

    /// An author's items. Unapproved ones are included only for the author
    /// and for admins.
    pub async fn by_author(
        &self,
        kind: ContentKind,
        author_id: Uuid,
        page: PageRequest,
        viewer: Option<&Principal>,
    ) -> Result<Page<ContentItem>, ServiceError> {
        let include_unapproved =
            viewer.is_some_and(|viewer| viewer.user_id == author_id || viewer.is_admin());
        let page = self
            .content
            .list_content(
                kind,
                ContentScope::Author {
                    author_id,
                    include_unapproved,
                },
                &ContentFilter::default(),
                page,
            )
            .await?;
        self.annotate_page(page, viewer).await
    }

    pub async fn mine(
        &self,
        principal: &Principal,
        kind: ContentKind,
        page: PageRequest,
    ) -> Result<Page<ContentItem>, ServiceError> {
        self.by_author(kind, principal.user_id, page, Some(principal))
            .await
    }

    /// The review queue, oldest submission first.
    pub async fn pending(
        &self,
        principal: &Principal,
        kind: ContentKind,
        page: PageRequest,
    ) -> Result<Page<ContentItem>, ServiceError> {
        if !principal.is_admin() {
            return Err(ServiceError::forbidden("admin role required"));
        }
        let page = self
            .content
            .list_content(kind, ContentScope::Pending, &ContentFilter::default(), page)
            .await?;
        self.annotate_page(page, Some(principal)).await
    }

    pub async fn status_counts(&self, kind: ContentKind) -> Result<StatusCounts, ServiceError> {
        Ok(self.content.count_by_status(kind).await?)
    }

    pub async fn dashboard(&self, principal: &Principal) -> Result<DashboardResponse, ServiceError> {
        if !principal.is_admin() {
            return Err(ServiceError::forbidden("admin role required"));
        }
        Ok(DashboardResponse {
            stories: self.status_counts(ContentKind::Story).await?,
            videos: self.status_counts(ContentKind::Video).await?,
            shots: self.status_counts(ContentKind::Shot).await?,
            registered_users: self.users.count_users().await?,
        })
    }

    /// Public link for an approved item.
    pub async fn share_link(&self, kind: ContentKind, id: Uuid) -> Result<String, ServiceError> {
        let record = self.load_visible(kind, id, None).await?;
        Ok(format!(
            "{}/{}/{}",
            self.options.public_base_url.trim_end_matches('/'),
            kind.as_str(),
            record.id
        ))
    }

    async fn annotate_page(
        &self,
        page: Page<ContentRecord>,
        viewer: Option<&Principal>,
    ) -> Result<Page<ContentItem>, ServiceError> {
        let Page {
            items,
            total,
            page,
            page_size,
        } = page;
        let items = self.annotate(items, viewer).await?;
        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    /// Attaches author names and the viewer's mature-content state.
    pub(crate) async fn annotate(
        &self,
        records: Vec<ContentRecord>,
        viewer: Option<&Principal>,
    ) -> Result<Vec<ContentItem>, ServiceError> {
        let author_ids: Vec<Uuid> = records
            .iter()
            .map(|record| record.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors = self.users.find_users(&author_ids).await?;

        let mature_ids: Vec<Uuid> = records
            .iter()
            .filter(|record| record.mature_content)
            .map(|record| record.id)
            .collect();
        let acknowledged = match viewer {
            Some(viewer) if !mature_ids.is_empty() => {
                self.acks
                    .acknowledged_among(viewer.user_id, &mature_ids)
                    .await?
            }
            _ => HashSet::new(),
        };

        Ok(records
            .into_iter()
            .map(|record| {
                let author_anonymous_name = match authors.get(&record.author_id) {
                    Some(author) => author.anonymous_name.clone(),
                    None => {
                        debug!(
                            target = "storyloft::application::content",
                            author_id = %record.author_id,
                            "author record missing"
                        );
                        UNKNOWN_AUTHOR.to_string()
                    }
                };
                let is_author = viewer.is_some_and(|viewer| viewer.user_id == record.author_id);
                let requires_acknowledgement =
                    record.mature_content && !is_author && !acknowledged.contains(&record.id);
                ContentItem {
                    record,
                    author_anonymous_name,
                    requires_acknowledgement,
                }
            })
            .collect())
    }
}
