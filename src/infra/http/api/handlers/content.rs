//! Handlers shared by the story, video and shot collections. The collection
//! is injected as an `Extension<ContentKind>` by the nested router.

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use storyloft_api_types::{
    ApprovalRequest, ContentCreateRequest, ContentUpdateRequest, LikedResponse, ShareLink,
};
use uuid::Uuid;

use crate::application::content::{
    CreateContentCommand, Decision, ListContentQuery, UpdateContentCommand,
};
use crate::domain::types::{ContentKind, LikeTarget};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser, MaybeUser};
use crate::infra::http::api::models::{content_list, content_view, like_view};
use crate::infra::http::api::state::ApiState;

use super::{ContentListQuery, PageQuery};

fn create_command(payload: ContentCreateRequest) -> CreateContentCommand {
    CreateContentCommand {
        title: payload.title,
        body: payload.body,
        media_url: payload.media_url,
        thumbnail_url: payload.thumbnail_url,
        tags: payload.tags,
        mature_content: payload.mature_content,
        submit: payload.submit,
    }
}

pub async fn list_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<ContentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .content
        .list_public(
            kind,
            ListContentQuery {
                page: PageQuery {
                    page: query.page,
                    page_size: query.page_size,
                }
                .request(),
                search: query.search,
                tag: query.tag,
            },
            viewer.principal(),
        )
        .await?;
    Ok(Json(content_list(page)))
}

pub async fn create_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiJson(payload): ApiJson<ContentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .content
        .create(&principal, kind, create_command(payload))
        .await?;
    let item = state.content.present(record, &principal).await?;
    Ok((StatusCode::CREATED, Json(content_view(item))))
}

/// Admin fast path that publishes without a review round.
pub async fn create_preapproved_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiJson(payload): ApiJson<ContentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .content
        .create_preapproved(&principal, kind, create_command(payload))
        .await?;
    let item = state.content.present(record, &principal).await?;
    Ok((StatusCode::CREATED, Json(content_view(item))))
}

pub async fn list_my_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .content
        .mine(&principal, kind, query.request())
        .await?;
    Ok(Json(content_list(page)))
}

pub async fn list_pending_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .content
        .pending(&principal, kind, query.request())
        .await?;
    Ok(Json(content_list(page)))
}

pub async fn list_author_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    viewer: MaybeUser,
    ApiPath(author_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .content
        .by_author(kind, author_id, query.request(), viewer.principal())
        .await?;
    Ok(Json(content_list(page)))
}

pub async fn get_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.content.get(kind, id, viewer.principal()).await?;
    Ok(Json(content_view(item)))
}

pub async fn update_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ContentUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateContentCommand {
        title: payload.title,
        body: payload.body,
        media_url: payload.media_url,
        thumbnail_url: payload.thumbnail_url,
        tags: payload.tags,
        mature_content: payload.mature_content,
    };
    let record = state.content.update(&principal, kind, id, command).await?;
    let item = state.content.present(record, &principal).await?;
    Ok(Json(content_view(item)))
}

pub async fn delete_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete(&principal, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.content.submit(&principal, kind, id).await?;
    let item = state.content.present(record, &principal).await?;
    Ok(Json(content_view(item)))
}

pub async fn decide_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ApprovalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let decision = Decision::from_request(payload.approved, payload.rejection_reason);
    let record = state.content.decide(&principal, kind, id, decision).await?;
    let item = state.content.present(record, &principal).await?;
    Ok(Json(content_view(item)))
}

pub async fn toggle_content_like(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .engagement
        .toggle_like(&principal, LikeTarget::content(kind, id))
        .await?;
    Ok(Json(like_view(outcome)))
}

pub async fn content_liked(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let liked = state
        .engagement
        .is_liked(&principal, LikeTarget::content(kind, id))
        .await?;
    Ok(Json(LikedResponse { liked }))
}

pub async fn share_content(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let share_link = state.content.share_link(kind, id).await?;
    Ok(Json(ShareLink { share_link }))
}

pub async fn acknowledge_mature(
    State(state): State<ApiState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .content
        .acknowledge_mature(&principal, kind, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
