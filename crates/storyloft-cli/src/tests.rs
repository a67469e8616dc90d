use httpmock::MockServer;
use storyloft_api_types::{ContentKind, VoteDirection};
use time::macros::datetime;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::optimistic::{LikeState, Optimistic, VoteState};
use crate::session::{Session, SessionStore};

const NEW_TOKENS: &str = r#"{"access_token":"sl_new_access","refresh_token":"sl_new_refresh","token_type":"Bearer","access_expires_at":"2030-01-01T00:00:00Z"}"#;

fn session(access: &str) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: "sl_old_refresh".to_string(),
        access_expires_at: datetime!(2030-01-01 00:00 UTC),
    }
}

fn client(server: &MockServer, session: Option<Session>) -> ApiClient {
    ApiClient::new(&server.base_url(), SessionStore::in_memory(session)).expect("client")
}

#[tokio::test]
async fn unauthorized_triggers_one_refresh_and_retry() -> Result<(), ClientError> {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let path = format!("/api/stories/{id}/liked");

    let stale = server.mock(|when, then| {
        when.method("GET")
            .path(path.as_str())
            .header("authorization", "Bearer sl_old_access");
        then.status(401).body(r#"{"error":{"code":"unauthorized","message":"expired"}}"#);
    });
    let fresh = server.mock(|when, then| {
        when.method("GET")
            .path(path.as_str())
            .header("authorization", "Bearer sl_new_access");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"liked":true}"#);
    });
    let refresh = server.mock(|when, then| {
        when.method("POST")
            .path("/api/auth/refresh")
            .json_body_includes(r#"{"refresh_token":"sl_old_refresh"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(NEW_TOKENS);
    });

    let client = client(&server, Some(session("sl_old_access")));
    assert!(client.is_liked(ContentKind::Story, id).await?);

    stale.assert();
    fresh.assert();
    refresh.assert();
    assert_eq!(
        client.session().access_token().await.as_deref(),
        Some("sl_new_access")
    );
    Ok(())
}

#[tokio::test]
async fn concurrent_unauthorized_calls_share_one_refresh() -> Result<(), ClientError> {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let path = format!("/api/videos/{id}/liked");

    server.mock(|when, then| {
        when.method("GET")
            .path(path.as_str())
            .header("authorization", "Bearer sl_old_access");
        then.status(401).body("{}");
    });
    server.mock(|when, then| {
        when.method("GET")
            .path(path.as_str())
            .header("authorization", "Bearer sl_new_access");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"liked":false}"#);
    });
    let refresh = server.mock(|when, then| {
        when.method("POST").path("/api/auth/refresh");
        then.status(200)
            .header("content-type", "application/json")
            .body(NEW_TOKENS);
    });

    let client = client(&server, Some(session("sl_old_access")));
    let (first, second, third) = tokio::join!(
        client.is_liked(ContentKind::Video, id),
        client.is_liked(ContentKind::Video, id),
        client.is_liked(ContentKind::Video, id),
    );

    assert!(!first?);
    assert!(!second?);
    assert!(!third?);
    refresh.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn failed_refresh_clears_session() {
    let server = MockServer::start();
    let id = Uuid::new_v4();

    let stale = server.mock(|when, then| {
        when.method("GET").path(format!("/api/shots/{id}/liked"));
        then.status(401).body("{}");
    });
    let refresh = server.mock(|when, then| {
        when.method("POST").path("/api/auth/refresh");
        then.status(401)
            .body(r#"{"error":{"code":"unauthorized","message":"refresh token revoked"}}"#);
    });

    let client = client(&server, Some(session("sl_old_access")));
    let err = client
        .is_liked(ContentKind::Shot, id)
        .await
        .expect_err("refresh failure should surface");

    assert!(err.is_authentication());
    stale.assert_hits(1);
    refresh.assert_hits(1);
    assert!(client.session().current().await.is_none());
}

#[tokio::test]
async fn anonymous_unauthorized_is_not_retried() {
    let server = MockServer::start();
    let me = server.mock(|when, then| {
        when.method("GET").path("/api/auth/me");
        then.status(401).body("{}");
    });
    let refresh = server.mock(|when, then| {
        when.method("POST").path("/api/auth/refresh");
        then.status(200).body(NEW_TOKENS);
    });

    let client = client(&server, None);
    let err = client
        .get::<serde_json::Value>("api/auth/me", &[])
        .await
        .expect_err("anonymous call should fail");

    assert!(matches!(err, ClientError::Authentication(_)));
    me.assert_hits(1);
    refresh.assert_hits(0);
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method("POST").path(format!("/api/comments/{id}/vote"));
        then.status(409)
            .body(r#"{"error":{"code":"conflict","message":"not pending"}}"#);
    });

    let client = client(&server, Some(session("sl_old_access")));
    let err = client
        .vote_comment(id, VoteDirection::Up)
        .await
        .expect_err("conflict");
    match err {
        ClientError::Conflict(message) => assert_eq!(message, "not pending"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn optimistic_like_rolls_back_on_failure() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method("POST").path(format!("/api/stories/{id}/like"));
        then.status(404)
            .body(r#"{"error":{"code":"not_found","message":"story not found"}}"#);
    });

    let client = client(&server, Some(session("sl_old_access")));
    let before = LikeState {
        liked: true,
        total_likes: 3,
    };
    let mut state = Optimistic::new(before);

    let err = client
        .toggle_like_optimistic(&mut state, ContentKind::Story, id)
        .await
        .expect_err("missing target");

    assert!(matches!(err, ClientError::NotFound(_)));
    assert_eq!(*state.get(), before);
}

#[tokio::test]
async fn optimistic_vote_reconciles_with_server_tallies() -> Result<(), ClientError> {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method("POST")
            .path(format!("/api/comments/{id}/vote"))
            .json_body_includes(r#"{"vote":"down"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"upvotes":4,"downvotes":2,"score":2,"user_vote":"down"}"#);
    });

    let client = client(&server, Some(session("sl_old_access")));
    let mut state = Optimistic::new(VoteState::default());
    client
        .vote_optimistic(&mut state, id, VoteDirection::Down)
        .await?;

    assert_eq!(
        *state.get(),
        VoteState {
            upvotes: 4,
            downvotes: 2,
            user_vote: Some(VoteDirection::Down),
        }
    );
    Ok(())
}

#[tokio::test]
async fn session_file_round_trips_and_clears() -> Result<(), ClientError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");

    let store = SessionStore::load(&path).await?;
    assert!(store.current().await.is_none());
    store.replace(session("sl_saved")).await?;

    let restored = SessionStore::load(&path).await?;
    assert_eq!(restored.access_token().await.as_deref(), Some("sl_saved"));

    restored.clear().await?;
    assert!(!path.exists());
    Ok(())
}
