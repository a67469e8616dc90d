use std::time::Instant;

use axum::extract::{MatchedPath, State};
use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::application::monitoring::RequestSample;
use crate::application::sessions::Principal;
use crate::infra::telemetry::{METRIC_HTTP_DURATION, METRIC_HTTP_ERRORS, METRIC_HTTP_REQUESTS};

use super::api::ApiState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Feeds the in-process monitoring recorder and the metrics facade.
pub async fn record_requests(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let label = format!("{method} {endpoint}");
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status().as_u16();
    let user_id = response
        .extensions()
        .get::<Principal>()
        .map(|principal| principal.user_id);

    counter!(
        METRIC_HTTP_REQUESTS,
        "endpoint" => label.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(METRIC_HTTP_DURATION, "endpoint" => label.clone()).record(duration_ms);
    if status >= 400 {
        counter!(METRIC_HTTP_ERRORS, "endpoint" => label).increment(1);
    }

    state.monitoring.recorder().record(RequestSample {
        method,
        endpoint,
        path,
        status,
        duration_ms,
        user_id,
        at: OffsetDateTime::now_utc(),
    });

    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let user_id = response
            .extensions()
            .get::<Principal>()
            .map(|principal| principal.user_id.to_string())
            .unwrap_or_default();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "storyloft::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                user_id = user_id,
                "request failed",
            );
        } else {
            warn!(
                target = "storyloft::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                user_id = user_id,
                "client request error",
            );
        }
    }

    response
}
