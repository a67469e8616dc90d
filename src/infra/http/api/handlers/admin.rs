//! Admin dashboard, audit trail and monitoring handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use storyloft_api_types::{AuditEntryView, ErrorsResponse};

use crate::application::audit::MAX_AUDIT_LIMIT;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiQuery, CurrentUser};
use crate::infra::http::api::models::audit_view;
use crate::infra::http::api::state::ApiState;

use super::LimitQuery;

const DEFAULT_AUDIT_LIMIT: u32 = 50;

pub async fn dashboard(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.dashboard(&principal).await?))
}

pub async fn list_audit_logs(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if !principal.is_admin() {
        return Err(ApiError::forbidden("admin role required"));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let records = state.audit.list_recent(limit).await?;
    Ok(Json(
        records
            .into_iter()
            .map(audit_view)
            .collect::<Vec<AuditEntryView>>(),
    ))
}

pub async fn metrics_summary(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.monitoring.summary(&principal).await?))
}

pub async fn recent_errors(
    State(state): State<ApiState>,
    CurrentUser(principal): CurrentUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = state.monitoring.recent_errors(&principal, query.limit)?;
    Ok(Json(ErrorsResponse { errors }))
}
