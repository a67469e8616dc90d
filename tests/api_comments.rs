mod support;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use support::{Account, TestApp, error_code};

async fn comment(
    app: &TestApp,
    author: &Account,
    story: Uuid,
    parent: Option<&str>,
    text: &str,
) -> support::Response {
    let mut payload = json!({ "target_kind": "story", "target_id": story, "content": text });
    if let Some(parent) = parent {
        payload["parent_id"] = Value::from(parent);
    }
    app.post("/api/comments", Some(&author.token), payload).await
}

#[tokio::test]
async fn replies_nest_up_to_five_levels() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Threaded").await;

    let root = comment(&app, &bob, story, None, "root").await;
    assert_eq!(root.status, StatusCode::CREATED);
    assert_eq!(root.body["depth"], 0);
    assert_eq!(root.body["anonymous_name"].as_str().map(str::is_empty), Some(false));

    let mut parent = root.body["id"].as_str().expect("id").to_string();
    for expected in 1..=5 {
        let reply = comment(&app, &alice, story, Some(&parent), "deeper").await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        assert_eq!(reply.body["depth"], expected);
        parent = reply.body["id"].as_str().expect("id").to_string();
    }

    let too_deep = comment(&app, &bob, story, Some(&parent), "too deep").await;
    assert_eq!(too_deep.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&too_deep), "validation_error");

    let thread = app
        .get(&format!("/api/comments/story/{story}"), None)
        .await;
    assert_eq!(thread.status, StatusCode::OK);
    let roots = thread.body.as_array().expect("roots");
    assert_eq!(roots.len(), 1);

    let mut node = &roots[0];
    let mut depth = 0;
    while let Some(child) = node["replies"].as_array().and_then(|replies| replies.first()) {
        node = child;
        depth += 1;
    }
    assert_eq!(depth, 5);
}

#[tokio::test]
async fn comments_on_hidden_targets_are_not_found() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let draft = app
        .post(
            "/api/stories",
            Some(&alice.token),
            json!({ "title": "Private", "body": "notes" }),
        )
        .await;
    let id: Uuid = draft.body["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("id");

    let res = comment(&app, &bob, id, None, "hello?").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let unknown = app
        .get(&format!("/api/comments/podcast/{id}"), None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn votes_switch_and_retract() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Votes").await;
    let root = comment(&app, &alice, story, None, "vote on me").await;
    let id = root.body["id"].as_str().expect("id").to_string();
    let uri = format!("/api/comments/{id}/vote");

    let up = app.post(&uri, Some(&bob.token), json!({ "vote": "up" })).await;
    assert_eq!(up.status, StatusCode::OK);
    assert_eq!(up.body["score"], 1);
    assert_eq!(up.body["user_vote"], "up");

    let down = app.post(&uri, Some(&bob.token), json!({ "vote": "down" })).await;
    assert_eq!(down.body["upvotes"], 0);
    assert_eq!(down.body["downvotes"], 1);
    assert_eq!(down.body["score"], -1);

    let retracted = app.post(&uri, Some(&bob.token), json!({ "vote": "down" })).await;
    assert_eq!(retracted.body["score"], 0);
    assert!(retracted.body["user_vote"].is_null());

    let bad = app
        .post(&uri, Some(&bob.token), json!({ "vote": "sideways" }))
        .await;
    assert_eq!(bad.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn thread_reflects_viewer_likes_and_votes() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Annotated").await;
    let root = comment(&app, &alice, story, None, "like me").await;
    let id = root.body["id"].as_str().expect("id").to_string();

    let liked = app
        .post(&format!("/api/comments/{id}/like"), Some(&bob.token), json!({}))
        .await;
    assert_eq!(liked.body["liked"], true);
    assert_eq!(liked.body["total_likes"], 1);
    app.post(
        &format!("/api/comments/{id}/vote"),
        Some(&bob.token),
        json!({ "vote": "up" }),
    )
    .await;

    let as_bob = app
        .get(&format!("/api/comments/story/{story}"), Some(&bob.token))
        .await;
    assert_eq!(as_bob.body[0]["is_liked"], true);
    assert_eq!(as_bob.body[0]["my_vote"], "up");
    assert_eq!(as_bob.body[0]["likes"], 1);

    let anonymous = app
        .get(&format!("/api/comments/story/{story}"), None)
        .await;
    assert_eq!(anonymous.body[0]["is_liked"], false);
    assert!(anonymous.body[0]["my_vote"].is_null());
}

#[tokio::test]
async fn only_the_author_edits_or_deletes_a_comment() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Edits").await;
    let root = comment(&app, &alice, story, None, "first draft").await;
    let id = root.body["id"].as_str().expect("id").to_string();
    comment(&app, &bob, story, Some(&id), "a reply").await;

    let hijack = app
        .send(
            Method::PUT,
            &format!("/api/comments/{id}"),
            Some(&bob.token),
            Some(json!({ "content": "mine now" })),
        )
        .await;
    assert_eq!(hijack.status, StatusCode::FORBIDDEN);

    let edited = app
        .send(
            Method::PUT,
            &format!("/api/comments/{id}"),
            Some(&alice.token),
            Some(json!({ "content": "second draft" })),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["content"], "second draft");

    let removed = app
        .send(
            Method::DELETE,
            &format!("/api/comments/{id}"),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let thread = app
        .get(&format!("/api/comments/story/{story}"), None)
        .await;
    assert_eq!(thread.body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn blank_comments_are_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Quiet").await;

    let res = comment(&app, &alice, story, None, "   ").await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn posting_a_comment_emits_a_structured_event() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("storyloft=debug")
        .with_test_writer()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Logged").await;

    let res = comment(&app, &alice, story, None, "hello").await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["target_kind"], "story");
}
