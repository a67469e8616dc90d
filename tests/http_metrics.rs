mod support;

use std::collections::HashSet;
use std::sync::OnceLock;

use axum::http::StatusCode;
use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use serde_json::json;
use serial_test::serial;

use storyloft::infra::http::ApiOptions;
use support::TestApp;

/// The global recorder can only be installed once per test process.
fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        snapshotter
    })
}

fn metric_names() -> HashSet<String> {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect()
}

#[tokio::test]
#[serial]
async fn request_paths_emit_expected_metric_keys() {
    snapshotter();
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Measured").await;

    let liked = app
        .post(&format!("/api/stories/{story}/like"), Some(&bob.token), json!({}))
        .await;
    assert_eq!(liked.status, StatusCode::OK);
    let missing = app
        .get(&format!("/api/videos/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let names = metric_names();
    let expected = [
        "storyloft_http_requests_total",
        "storyloft_http_errors_total",
        "storyloft_http_request_duration_ms",
        "storyloft_likes_toggled_total",
        "storyloft_moderation_decisions_total",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}

#[tokio::test]
#[serial]
async fn throttled_requests_are_counted() {
    snapshotter();
    let app = TestApp::with_options(ApiOptions {
        rate_limit_max_requests: 1,
        ..ApiOptions::default()
    });

    app.get("/api/stories", None).await;
    let throttled = app.get("/api/stories", None).await;
    assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);

    assert!(metric_names().contains("storyloft_rate_limited_total"));
}
