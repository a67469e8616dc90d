//! Registration and session handlers

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use storyloft_api_types::{LogoutRequest, RefreshRequest, RegisterRequest, TokenResponse};

use crate::application::accounts::RegisterCommand;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, CurrentUser};
use crate::infra::http::api::models::{registration_view, user_view};
use crate::infra::http::api::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = state
        .accounts
        .register(RegisterCommand {
            username: payload.username,
            anonymous_name: payload.anonymous_name,
            referral_code: payload.referral_code,
            desired_referral_code: payload.desired_referral_code,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(registration_view(registration))))
}

pub async fn refresh(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pair = state.sessions.refresh(payload.refresh_token.trim()).await?;
    Ok(Json(TokenResponse::from(pair)))
}

pub async fn logout(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // The body is optional; an empty one only ends the access session.
    let payload: LogoutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::bad_request("Malformed request body", Some(err.to_string())))?
    };
    let refresh_token = payload.refresh_token.filter(|token| !token.trim().is_empty());
    state
        .sessions
        .logout(&principal, refresh_token.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.accounts.me(principal.user_id).await?;
    Ok(Json(user_view(user)))
}
