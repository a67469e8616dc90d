//! Story chapter handlers

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use storyloft_api_types::{ChapterCreateRequest, ChapterUpdateRequest, ChapterView};
use uuid::Uuid;

use crate::application::chapters::{CreateChapterCommand, UpdateChapterCommand};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiPath, CurrentUser, MaybeUser};
use crate::infra::http::api::models::chapter_view;
use crate::infra::http::api::state::ApiState;

pub async fn list_chapters(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    ApiPath(story_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let chapters = state.chapters.list(story_id, viewer.principal()).await?;
    Ok(Json(
        chapters
            .into_iter()
            .map(chapter_view)
            .collect::<Vec<ChapterView>>(),
    ))
}

pub async fn create_chapter(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(story_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ChapterCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chapter = state
        .chapters
        .create(
            &principal,
            story_id,
            CreateChapterCommand {
                title: payload.title,
                content: payload.content,
                chapter_number: payload.chapter_number,
                published: payload.published,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(chapter_view(chapter))))
}

pub async fn get_chapter(
    State(state): State<ApiState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let chapter = state.chapters.get(id, viewer.principal()).await?;
    Ok(Json(chapter_view(chapter)))
}

pub async fn update_chapter(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ChapterUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chapter = state
        .chapters
        .update(
            &principal,
            id,
            UpdateChapterCommand {
                title: payload.title,
                content: payload.content,
                chapter_number: payload.chapter_number,
            },
        )
        .await?;
    Ok(Json(chapter_view(chapter)))
}

pub async fn publish_chapter(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let chapter = state.chapters.set_published(&principal, id, true).await?;
    Ok(Json(chapter_view(chapter)))
}

pub async fn delete_chapter(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.chapters.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
