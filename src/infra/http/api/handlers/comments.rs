//! Comment thread, vote and comment-like handlers

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use storyloft_api_types::{CommentCreateRequest, CommentUpdateRequest, CommentView, VoteRequest};
use uuid::Uuid;

use crate::application::comments::PostCommentCommand;
use crate::domain::types::{CommentTarget, CommentTargetKind, LikeTarget};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiPath, CurrentUser, MaybeUser};
use crate::infra::http::api::models::{
    authored_comment_view, comment_view, like_view, vote_view,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_comments(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    ApiPath((target, id)): ApiPath<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: CommentTargetKind = target
        .parse()
        .map_err(|_| ApiError::not_found(format!("unknown comment target `{target}`")))?;
    let threads = state
        .comments
        .list(CommentTarget::new(kind, id), viewer.principal())
        .await?;
    Ok(Json(
        threads
            .into_iter()
            .map(comment_view)
            .collect::<Vec<CommentView>>(),
    ))
}

pub async fn post_comment(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiJson(payload): ApiJson<CommentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .comments
        .post(
            &principal,
            PostCommentCommand {
                target: CommentTarget::new(payload.target_kind, payload.target_id),
                content: payload.content,
                parent_id: payload.parent_id,
                selected_text: payload.selected_text,
                text_position: payload.text_position,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(authored_comment_view(record, &principal.anonymous_name)),
    ))
}

pub async fn edit_comment(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CommentUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .comments
        .edit(&principal, id, &payload.content)
        .await?;
    Ok(Json(authored_comment_view(record, &principal.anonymous_name)))
}

pub async fn delete_comment(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.comments.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn vote_comment(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tally = state.engagement.vote(&principal, id, payload.vote).await?;
    Ok(Json(vote_view(tally)))
}

pub async fn toggle_comment_like(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .engagement
        .toggle_like(&principal, LikeTarget::comment(id))
        .await?;
    Ok(Json(like_view(outcome)))
}
