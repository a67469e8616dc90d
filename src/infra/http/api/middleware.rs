use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::warn;

use crate::application::sessions::{AuthError, Principal};
use crate::infra::telemetry::METRIC_RATE_LIMITED;

use super::error::ApiError;
use super::state::ApiState;

/// Resolves the bearer token, when one is sent, into a [`Principal`].
/// Requests without a token pass through anonymously; endpoints that need a
/// caller reject them through the `CurrentUser` extractor.
pub async fn session_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(header_value) = request.headers().get(header::AUTHORIZATION) else {
        return next.run(request).await;
    };

    let token = match header_value
        .to_str()
        .ok()
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
    {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => return ApiError::from(AuthError::Missing).into_response(),
    };

    let principal = match state.sessions.authenticate(&token).await {
        Ok(principal) => principal,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let forwarded = state
        .rate_limiter
        .trusts_forwarded_for()
        .then(|| forwarded_client(request.headers()))
        .flatten();
    let key = rate_limit_key(request.extensions().get::<Principal>(), forwarded, peer);

    let (allowed, _remaining) = state.rate_limiter.allow(&key);
    if !allowed {
        counter!(METRIC_RATE_LIMITED).increment(1);
        warn!(
            target = "storyloft::api::ratelimit",
            key = %key,
            limit = state.rate_limiter.limit(),
            "rate limit exceeded"
        );
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs(&key));
    }

    next.run(request).await
}

/// Principal first, then the proxy-reported client, then the socket peer.
fn rate_limit_key(
    principal: Option<&Principal>,
    forwarded: Option<&str>,
    peer: Option<SocketAddr>,
) -> String {
    if let Some(principal) = principal {
        return format!("user:{}", principal.user_id);
    }
    if let Some(client) = forwarded {
        return format!("ip:{client}");
    }
    match peer {
        Some(addr) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use uuid::Uuid;

    use super::*;
    use crate::domain::types::UserRole;

    #[test]
    fn key_prefers_principal_then_forwarded_then_peer() {
        let principal = Principal {
            user_id: Uuid::nil(),
            role: UserRole::User,
            anonymous_name: "Quiet Owl".to_string(),
            session_id: Uuid::nil(),
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let peer: SocketAddr = "198.51.100.4:55012".parse().expect("addr");
        let forwarded = forwarded_client(&headers);
        assert_eq!(forwarded, Some("203.0.113.7"));

        assert_eq!(
            rate_limit_key(Some(&principal), forwarded, Some(peer)),
            format!("user:{}", Uuid::nil())
        );
        assert_eq!(rate_limit_key(None, forwarded, Some(peer)), "ip:203.0.113.7");
        assert_eq!(rate_limit_key(None, None, Some(peer)), "ip:198.51.100.4");
        assert_eq!(rate_limit_key(None, None, None), "anonymous");
        assert_eq!(forwarded_client(&HeaderMap::new()), None);
    }
}
