//! Points, referral and leaderboard handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use storyloft_api_types::{ContentView, LeaderboardResponse};
use uuid::Uuid;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiPath, ApiQuery, CurrentUser};
use crate::infra::http::api::models::content_view;
use crate::infra::http::api::state::ApiState;

use super::LimitQuery;

pub async fn my_stats(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.points.stats(principal.user_id).await?))
}

pub async fn user_stats(
    State(state): State<ApiState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.points.stats(user_id).await?))
}

pub async fn my_points(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.points.breakdown(principal.user_id).await?))
}

pub async fn my_referral(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.points.referral_info(principal.user_id).await?))
}

pub async fn my_liked_content(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.engagement.liked_content(&principal).await?;
    Ok(Json(
        items
            .into_iter()
            .map(content_view)
            .collect::<Vec<ContentView>>(),
    ))
}

pub async fn leaderboard(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.points.leaderboard(query.limit).await?;
    Ok(Json(LeaderboardResponse { entries }))
}
