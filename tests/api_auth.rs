mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use support::{TestApp, error_code};

#[tokio::test]
async fn health_is_no_content_without_database() {
    let app = TestApp::new();
    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn register_then_me_returns_the_account() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let me = app.get("/api/auth/me", Some(&alice.token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");
    assert_eq!(me.body["role"], "user");
    assert_eq!(me.body["referral_code"], alice.referral_code.as_str());
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = TestApp::new();
    app.register("alice").await;
    let res = app
        .post("/api/auth/register", None, json!({ "username": "alice" }))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_username_is_a_validation_error() {
    let app = TestApp::new();
    let res = app
        .post("/api/auth/register", None, json!({ "username": "a b" }))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&res), "validation_error");
}

#[tokio::test]
async fn referral_code_credits_the_referrer_once_per_registration() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    for name in ["bob", "carol"] {
        let res = app
            .post(
                "/api/auth/register",
                None,
                json!({ "username": name, "referral_code": alice.referral_code }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["referral_applied"], true);
    }

    let stats = app.get("/api/users/me/stats", Some(&alice.token)).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["referral_count"], 2);
    assert_eq!(stats.body["points"], 20);

    let referral = app.get("/api/users/me/referral", Some(&alice.token)).await;
    assert_eq!(referral.body["referral_count"], 2);
    assert_eq!(referral.body["points_from_referrals"], 20);
}

#[tokio::test]
async fn unknown_referral_code_still_registers() {
    let app = TestApp::new();
    let res = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "dave", "referral_code": "NOPE1234" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["referral_applied"], false);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = TestApp::new();
    let res = app
        .post("/api/stories", None, json!({ "title": "Untold" }))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&res), "unauthorized");
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected_even_on_public_routes() {
    let app = TestApp::new();
    let res = app.get("/api/stories", Some("not-a-token")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_and_spent_token_is_revoked() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let first = app
        .post(
            "/api/auth/refresh",
            None,
            json!({ "refresh_token": alice.refresh_token }),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let new_access = first.body["access_token"].as_str().expect("access token");
    assert_ne!(new_access, alice.token);
    assert_eq!(
        app.get("/api/auth/me", Some(new_access)).await.status,
        StatusCode::OK
    );

    let reused = app
        .post(
            "/api/auth/refresh",
            None,
            json!({ "refresh_token": alice.refresh_token }),
        )
        .await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&reused), "token_revoked");
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let res = app
        .send(Method::POST, "/api/auth/logout", Some(&alice.token), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let me = app.get("/api/auth/me", Some(&alice.token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_json_is_bad_request_and_wrong_shape_is_unprocessable() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/stories")
        .header(header::AUTHORIZATION, format!("Bearer {}", alice.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request should build");
    let malformed = app.dispatch(request).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&malformed), "bad_request");

    let wrong_shape = app
        .post("/api/stories", Some(&alice.token), json!({ "body": "no title" }))
        .await;
    assert_eq!(wrong_shape.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_path_id_is_bad_request() {
    let app = TestApp::new();
    let res = app.get("/api/stories/not-a-uuid", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&res), "bad_request");
}
