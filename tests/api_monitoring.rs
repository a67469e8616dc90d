mod support;

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use storyloft::infra::http::ApiOptions;
use support::{TestApp, error_code};

#[tokio::test]
async fn monitoring_is_admin_only() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let res = app.get("/api/monitoring/metrics", Some(&alice.token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let anonymous = app.get("/api/monitoring/metrics", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn summary_counts_requests_errors_and_users() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;

    app.get("/api/stories", Some(&alice.token)).await;
    app.get("/api/stories", Some(&alice.token)).await;
    let missing = app
        .get(
            "/api/stories/00000000-0000-0000-0000-000000000001",
            Some(&alice.token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let summary = app.get("/api/monitoring/metrics", Some(&admin.token)).await;
    assert_eq!(summary.status, StatusCode::OK);
    // Two registrations, three reads; the summary request itself is
    // recorded only after it responds.
    assert_eq!(summary.body["total_requests"], 5);
    assert_eq!(summary.body["total_errors"], 1);
    assert_eq!(summary.body["status_codes"]["404"], 1);
    assert_eq!(summary.body["daily_active_users"], 1);
    assert_eq!(summary.body["total_registered_users"], 2);

    let endpoints: Vec<&str> = summary.body["top_endpoints"]
        .as_array()
        .expect("top endpoints")
        .iter()
        .filter_map(|entry| entry["endpoint"].as_str())
        .collect();
    assert_eq!(endpoints.first(), Some(&"GET /api/stories"));
    assert!(endpoints.contains(&"GET /api/stories/{id}"), "{endpoints:?}");

    let errors = app
        .get("/api/monitoring/metrics/errors?limit=5", Some(&admin.token))
        .await;
    assert_eq!(errors.status, StatusCode::OK);
    let entries = errors.body["errors"].as_array().expect("errors");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status_code"], 404);
    assert_eq!(entries[0]["method"], "GET");
}

#[tokio::test]
async fn requests_beyond_the_window_limit_are_throttled() {
    let app = TestApp::with_options(ApiOptions {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max_requests: 2,
        ..ApiOptions::default()
    });

    assert_eq!(app.get("/api/stories", None).await.status, StatusCode::OK);
    assert_eq!(app.get("/api/videos", None).await.status, StatusCode::OK);

    let throttled = app.get("/api/shots", None).await;
    assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&throttled), "rate_limited");
    let retry_after: u64 = throttled
        .headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .expect("retry-after header");
    assert!((1..=60).contains(&retry_after));

    // Health checks sit outside the API limiter.
    assert_eq!(app.get("/health", None).await.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn limits_are_tracked_per_principal() {
    let app = TestApp::with_options(ApiOptions {
        rate_limit_max_requests: 3,
        ..ApiOptions::default()
    });
    // Registration itself spends one anonymous slot per account.
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    for _ in 0..3 {
        let res = app.get("/api/auth/me", Some(&alice.token)).await;
        assert_eq!(res.status, StatusCode::OK);
    }
    let blocked = app.get("/api/auth/me", Some(&alice.token)).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);

    let other = app.get("/api/auth/me", Some(&bob.token)).await;
    assert_eq!(other.status, StatusCode::OK);

    let comment = app
        .post("/api/comments", Some(&bob.token), json!({}))
        .await;
    assert_eq!(comment.status, StatusCode::UNPROCESSABLE_ENTITY);
}

fn anonymous_get(
    uri: &str,
    forwarded_for: Option<&str>,
    peer: Option<SocketAddr>,
) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(forwarded_for) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded_for);
    }
    if let Some(peer) = peer {
        builder = builder.extension(ConnectInfo(peer));
    }
    builder.body(Body::empty()).expect("request should build")
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_escape_the_limit() {
    let app = TestApp::with_options(ApiOptions {
        rate_limit_max_requests: 1,
        ..ApiOptions::default()
    });
    let peer: SocketAddr = "198.51.100.20:40000".parse().expect("addr");

    let mut allowed = 0;
    for n in 0..20 {
        let forwarded = format!("10.0.0.{n}");
        let res = app
            .dispatch(anonymous_get("/api/stories", Some(&forwarded), Some(peer)))
            .await;
        if res.status == StatusCode::OK {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 1);
}

#[tokio::test]
async fn anonymous_callers_are_keyed_by_socket_peer() {
    let app = TestApp::with_options(ApiOptions {
        rate_limit_max_requests: 1,
        ..ApiOptions::default()
    });
    let first: SocketAddr = "198.51.100.20:40000".parse().expect("addr");
    let second: SocketAddr = "198.51.100.21:40000".parse().expect("addr");

    let ok = app.dispatch(anonymous_get("/api/stories", None, Some(first))).await;
    assert_eq!(ok.status, StatusCode::OK);
    let blocked = app.dispatch(anonymous_get("/api/stories", None, Some(first))).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);

    let other = app.dispatch(anonymous_get("/api/stories", None, Some(second))).await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn trusted_proxy_header_separates_clients() {
    let app = TestApp::with_options(ApiOptions {
        rate_limit_max_requests: 1,
        trust_forwarded_for: true,
        ..ApiOptions::default()
    });
    let proxy: SocketAddr = "10.1.0.2:8080".parse().expect("addr");

    let first = app
        .dispatch(anonymous_get("/api/stories", Some("203.0.113.7"), Some(proxy)))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let again = app
        .dispatch(anonymous_get(
            "/api/stories",
            Some("203.0.113.7, 10.1.0.2"),
            Some(proxy),
        ))
        .await;
    assert_eq!(again.status, StatusCode::TOO_MANY_REQUESTS);
    let neighbour = app
        .dispatch(anonymous_get("/api/stories", Some("203.0.113.8"), Some(proxy)))
        .await;
    assert_eq!(neighbour.status, StatusCode::OK);
}
