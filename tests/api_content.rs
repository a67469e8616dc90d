mod support;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use storyloft::application::repos::EngagementRepo;
use storyloft::domain::types::{ContentKind, LikeTarget};
use storyloft::infra::http::ApiOptions;
use storyloft::infra::memory::MemoryRepositories;
use support::{TestApp, error_code};

#[tokio::test]
async fn story_moves_from_draft_to_approved_and_becomes_public() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;

    let created = app
        .post(
            "/api/stories",
            Some(&alice.token),
            json!({ "title": "Night Train", "body": "The carriage hummed.", "tags": ["Travel"] }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["status"], "draft");
    let id = created.body["id"].as_str().expect("id").to_string();

    // Drafts are invisible to everyone but the author.
    let hidden = app.get(&format!("/api/stories/{id}"), None).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let submitted = app
        .post(&format!("/api/stories/{id}/submit"), Some(&alice.token), json!({}))
        .await;
    assert_eq!(submitted.status, StatusCode::OK);
    assert_eq!(submitted.body["status"], "pending");

    let pending = app.get("/api/stories/pending", Some(&admin.token)).await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["total"], 1);

    let not_admin = app
        .post(
            &format!("/api/stories/{id}/approve"),
            Some(&alice.token),
            json!({ "approved": true }),
        )
        .await;
    assert_eq!(not_admin.status, StatusCode::FORBIDDEN);

    let approved = app
        .post(
            &format!("/api/stories/{id}/approve"),
            Some(&admin.token),
            json!({ "approved": true }),
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.body["status"], "approved");
    assert!(approved.body["published_at"].is_string());

    let listed = app.get("/api/stories?tag=travel", None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["total"], 1);
    assert_eq!(listed.body["items"][0]["title"], "Night Train");

    let videos = app.get("/api/videos", None).await;
    assert_eq!(videos.body["total"], 0);

    let share = app.get(&format!("/api/stories/{id}/share"), None).await;
    assert_eq!(share.status, StatusCode::OK);
    assert_eq!(
        share.body["share_link"],
        format!("http://localhost:3000/story/{id}")
    );
}

#[tokio::test]
async fn second_decision_on_the_same_item_conflicts() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    let id = app.approved_story(&alice, &admin, "Once").await;

    let again = app
        .post(
            &format!("/api/stories/{id}/approve"),
            Some(&admin.token),
            json!({ "approved": false, "rejection_reason": "changed my mind" }),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rejection_needs_a_reason_and_keeps_the_item_pending() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;

    let created = app
        .post(
            "/api/videos",
            Some(&alice.token),
            json!({ "title": "Clip", "media_url": "https://cdn.example/clip.mp4", "submit": true }),
        )
        .await;
    assert_eq!(created.body["status"], "pending");
    let id = created.body["id"].as_str().expect("id").to_string();

    let blank = app
        .post(
            &format!("/api/videos/{id}/approve"),
            Some(&admin.token),
            json!({ "approved": false, "rejection_reason": "   " }),
        )
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&blank), "validation_error");

    let still = app
        .get(&format!("/api/videos/{id}"), Some(&alice.token))
        .await;
    assert_eq!(still.body["status"], "pending");

    let rejected = app
        .post(
            &format!("/api/videos/{id}/approve"),
            Some(&admin.token),
            json!({ "approved": false, "rejection_reason": "audio is missing" }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["status"], "rejected");
    assert_eq!(rejected.body["rejection_reason"], "audio is missing");

    // Rejected items can be edited and resubmitted.
    let edited = app
        .send(
            Method::PUT,
            &format!("/api/videos/{id}"),
            Some(&alice.token),
            Some(json!({ "title": "Clip (with audio)" })),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    let resubmitted = app
        .post(&format!("/api/videos/{id}/submit"), Some(&alice.token), json!({}))
        .await;
    assert_eq!(resubmitted.body["status"], "pending");
}

#[tokio::test]
async fn video_without_media_cannot_be_submitted() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let res = app
        .post(
            "/api/videos",
            Some(&alice.token),
            json!({ "title": "Nothing here", "submit": true }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn pending_items_cannot_be_edited() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let created = app
        .post(
            "/api/shots",
            Some(&alice.token),
            json!({ "title": "Dusk", "media_url": "https://cdn.example/dusk.jpg", "submit": true }),
        )
        .await;
    let id = created.body["id"].as_str().expect("id").to_string();

    let res = app
        .send(
            Method::PUT,
            &format!("/api/shots/{id}"),
            Some(&alice.token),
            Some(json!({ "title": "Dawn" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn preapproved_creation_is_admin_only() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    let payload = json!({ "title": "Notice", "body": "Site rules." });

    let denied = app
        .post("/api/stories/preapproved", Some(&alice.token), payload.clone())
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let created = app
        .post("/api/stories/preapproved", Some(&admin.token), payload)
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["status"], "approved");
}

#[tokio::test]
async fn like_toggles_and_reports_state() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let id = app.approved_story(&alice, &admin, "Likeable").await;

    let liked = app
        .post(&format!("/api/stories/{id}/like"), Some(&bob.token), json!({}))
        .await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.body["liked"], true);
    assert_eq!(liked.body["total_likes"], 1);

    let state = app
        .get(&format!("/api/stories/{id}/liked"), Some(&bob.token))
        .await;
    assert_eq!(state.body["liked"], true);

    let mine = app.get("/api/users/me/liked", Some(&bob.token)).await;
    assert_eq!(mine.body.as_array().map(Vec::len), Some(1));

    let unliked = app
        .post(&format!("/api/stories/{id}/like"), Some(&bob.token), json!({}))
        .await;
    assert_eq!(unliked.body["liked"], false);
    assert_eq!(unliked.body["total_likes"], 0);
}

#[tokio::test]
async fn liking_a_hidden_item_is_not_found() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let created = app
        .post(
            "/api/stories",
            Some(&alice.token),
            json!({ "title": "Draft", "body": "wip" }),
        )
        .await;
    let id = created.body["id"].as_str().expect("id").to_string();

    let res = app
        .post(&format!("/api/stories/{id}/like"), Some(&bob.token), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mature_content_requires_acknowledgement_once() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;

    let created = app
        .post(
            "/api/stories",
            Some(&alice.token),
            json!({ "title": "After Dark", "body": "...", "mature_content": true, "submit": true }),
        )
        .await;
    let id = created.body["id"].as_str().expect("id").to_string();
    app.post(
        &format!("/api/stories/{id}/approve"),
        Some(&admin.token),
        json!({ "approved": true }),
    )
    .await;

    let before = app
        .get(&format!("/api/stories/{id}"), Some(&bob.token))
        .await;
    assert_eq!(before.body["requires_acknowledgement"], true);

    let ack = app
        .post(
            &format!("/api/stories/{id}/acknowledge-mature"),
            Some(&bob.token),
            json!({}),
        )
        .await;
    assert_eq!(ack.status, StatusCode::NO_CONTENT);

    let after = app
        .get(&format!("/api/stories/{id}"), Some(&bob.token))
        .await;
    assert_eq!(after.body["requires_acknowledgement"], false);
}

#[tokio::test]
async fn non_owner_reads_count_as_views() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    let id = app.approved_story(&alice, &admin, "Counted").await;

    app.get(&format!("/api/stories/{id}"), None).await;
    let own = app
        .get(&format!("/api/stories/{id}"), Some(&alice.token))
        .await;
    assert_eq!(own.body["views_count"], 1);
}

#[tokio::test]
async fn chapters_number_themselves_and_hide_unpublished_ones() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Serial").await;

    let first = app
        .post(
            &format!("/api/stories/{story}/chapters"),
            Some(&alice.token),
            json!({ "title": "One", "content": "Start.", "published": true }),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["chapter_number"], 1);

    let second = app
        .post(
            &format!("/api/stories/{story}/chapters"),
            Some(&alice.token),
            json!({ "title": "Two", "content": "Middle." }),
        )
        .await;
    assert_eq!(second.body["chapter_number"], 2);
    let second_id = second.body["id"].as_str().expect("id").to_string();

    let public = app
        .get(&format!("/api/stories/{story}/chapters"), None)
        .await;
    assert_eq!(public.body.as_array().map(Vec::len), Some(1));
    let owner = app
        .get(&format!("/api/stories/{story}/chapters"), Some(&alice.token))
        .await;
    assert_eq!(owner.body.as_array().map(Vec::len), Some(2));

    let published = app
        .post(
            &format!("/api/chapters/{second_id}/publish"),
            Some(&alice.token),
            json!({}),
        )
        .await;
    assert_eq!(published.body["published"], true);

    let duplicate = app
        .post(
            &format!("/api/stories/{story}/chapters"),
            Some(&alice.token),
            json!({ "title": "Again", "content": "x", "chapter_number": 2 }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn chapter_numbers_stay_within_range() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Long Serial").await;
    let path = format!("/api/stories/{story}/chapters");

    let huge = app
        .post(
            &path,
            Some(&alice.token),
            json!({ "title": "Far", "content": "x", "chapter_number": i32::MAX }),
        )
        .await;
    assert_eq!(huge.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&huge), "validation_error");

    let last = app
        .post(
            &path,
            Some(&alice.token),
            json!({ "title": "Last", "content": "x", "chapter_number": 100_000 }),
        )
        .await;
    assert_eq!(last.status, StatusCode::CREATED, "{}", last.body);

    let overflow = app
        .post(&path, Some(&alice.token), json!({ "title": "After", "content": "x" }))
        .await;
    assert_eq!(overflow.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&overflow), "validation_error");

    let room = app
        .post(
            &path,
            Some(&alice.token),
            json!({ "title": "Prologue", "content": "x", "chapter_number": 1 }),
        )
        .await;
    assert_eq!(room.status, StatusCode::CREATED);
}

#[tokio::test]
async fn crossing_a_like_milestone_reports_points_once() {
    let repos = Arc::new(MemoryRepositories::new());
    let app = TestApp::with_repositories(Arc::clone(&repos), ApiOptions::default());
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Popular").await;

    let target = LikeTarget::content(ContentKind::Story, story);
    for _ in 0..999 {
        repos
            .toggle_like(Uuid::new_v4(), target)
            .await
            .expect("seed like");
    }

    let points = app.get("/api/users/me/points", Some(&alice.token)).await;
    assert_eq!(points.body["like_points"], 0);
    assert_eq!(points.body["likes_until_next_point"], 1);

    let liked = app
        .post(&format!("/api/stories/{story}/like"), Some(&bob.token), json!({}))
        .await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.body["total_likes"], 1000);
    assert_eq!(liked.body["points_earned"], 1);

    let points = app.get("/api/users/me/points", Some(&alice.token)).await;
    assert_eq!(points.body["like_points"], 1);

    let unliked = app
        .post(&format!("/api/stories/{story}/like"), Some(&bob.token), json!({}))
        .await;
    assert_eq!(unliked.body["liked"], false);
    assert_eq!(unliked.body["total_likes"], 999);
    assert!(unliked.body.get("points_earned").is_none());

    // Points follow the live total, so climbing back over the line reports it again.
    let admin_like = app
        .post(&format!("/api/stories/{story}/like"), Some(&admin.token), json!({}))
        .await;
    assert_eq!(admin_like.body["total_likes"], 1000);
    assert_eq!(admin_like.body["points_earned"], 1);

    let carol = app.register("carol").await;
    let carol_like = app
        .post(&format!("/api/stories/{story}/like"), Some(&carol.token), json!({}))
        .await;
    assert_eq!(carol_like.body["total_likes"], 1001);
    assert!(carol_like.body.get("points_earned").is_none());
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    app.approved_story(&alice, &admin, "100% True").await;
    app.approved_story(&alice, &admin, "1000 Nights").await;
    app.approved_story(&alice, &admin, "snake_case diaries").await;

    let percent = app.get("/api/stories?search=100%25", None).await;
    assert_eq!(percent.status, StatusCode::OK);
    assert_eq!(percent.body["total"], 1);
    assert_eq!(percent.body["items"][0]["title"], "100% True");

    let underscore = app.get("/api/stories?search=e_c", None).await;
    assert_eq!(underscore.body["total"], 1);

    let everything = app.get("/api/stories?search=0", None).await;
    assert_eq!(everything.body["total"], 2);
}

#[tokio::test]
async fn deleting_a_story_removes_its_chapters_and_comments() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let admin = app.admin("moderator").await;
    let story = app.approved_story(&alice, &admin, "Ephemeral").await;

    let chapter = app
        .post(
            &format!("/api/stories/{story}/chapters"),
            Some(&alice.token),
            json!({ "title": "Only", "content": "Text", "published": true }),
        )
        .await;
    let chapter_id = chapter.body["id"].as_str().expect("id").to_string();
    let comment = app
        .post(
            "/api/comments",
            Some(&bob.token),
            json!({ "target_kind": "chapter", "target_id": chapter_id, "content": "Nice" }),
        )
        .await;
    assert_eq!(comment.status, StatusCode::CREATED);

    let deleted = app
        .send(
            Method::DELETE,
            &format!("/api/stories/{story}"),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    assert_eq!(
        app.get(&format!("/api/chapters/{chapter_id}"), None).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get(&format!("/api/comments/chapter/{chapter_id}"), None)
            .await
            .status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn dashboard_counts_by_status() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.admin("moderator").await;
    app.approved_story(&alice, &admin, "Approved").await;
    app.post(
        "/api/stories",
        Some(&alice.token),
        json!({ "title": "Draft", "body": "wip" }),
    )
    .await;

    let denied = app.get("/api/admin/dashboard", Some(&alice.token)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let dashboard = app.get("/api/admin/dashboard", Some(&admin.token)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["stories"]["total"], 2);
    assert_eq!(dashboard.body["stories"]["approved"], 1);
    assert_eq!(dashboard.body["stories"]["draft"], 1);
    assert_eq!(dashboard.body["registered_users"], 2);

    let audit = app.get("/api/admin/audit?limit=10", Some(&admin.token)).await;
    assert_eq!(audit.status, StatusCode::OK);
    let actions: Vec<&str> = audit
        .body
        .as_array()
        .expect("audit entries")
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert!(actions.contains(&"content.approved"), "{actions:?}");
}
