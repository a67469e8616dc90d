pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::{ApiOptions, ApiState, Repositories};

use axum::{
    Extension, Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::domain::types::ContentKind;
use crate::infra::http::middleware::{log_responses, record_requests};

/// Routes shared by every content collection; the kind rides along as an
/// extension so handlers stay generic.
fn content_routes(kind: ContentKind) -> Router<ApiState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_content).post(handlers::create_content),
        )
        .route("/preapproved", post(handlers::create_preapproved_content))
        .route("/mine", get(handlers::list_my_content))
        .route("/pending", get(handlers::list_pending_content))
        .route("/author/{author_id}", get(handlers::list_author_content))
        .route(
            "/{id}",
            get(handlers::get_content)
                .put(handlers::update_content)
                .delete(handlers::delete_content),
        )
        .route("/{id}/submit", post(handlers::submit_content))
        .route("/{id}/approve", post(handlers::decide_content))
        .route("/{id}/like", post(handlers::toggle_content_like))
        .route("/{id}/liked", get(handlers::content_liked))
        .route("/{id}/share", get(handlers::share_content))
        .route(
            "/{id}/acknowledge-mature",
            post(handlers::acknowledge_mature),
        )
        .layer(Extension(kind))
}

pub fn build_api_router(state: ApiState) -> Router {
    let auth_state = state.clone();
    let rate_state = state.clone();
    let record_state = state.clone();

    let stories = content_routes(ContentKind::Story).route(
        "/{id}/chapters",
        get(handlers::list_chapters).post(handlers::create_chapter),
    );

    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/refresh", post(handlers::refresh))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/me", get(handlers::me))
        .nest("/api/stories", stories)
        .nest("/api/videos", content_routes(ContentKind::Video))
        .nest("/api/shots", content_routes(ContentKind::Shot))
        .route(
            "/api/chapters/{id}",
            get(handlers::get_chapter)
                .put(handlers::update_chapter)
                .delete(handlers::delete_chapter),
        )
        .route("/api/chapters/{id}/publish", post(handlers::publish_chapter))
        .route("/api/comments", post(handlers::post_comment))
        // One parameter name per segment: `{key}` is the target kind on the
        // thread route and the comment id everywhere else.
        .route("/api/comments/{key}/{id}", get(handlers::list_comments))
        .route(
            "/api/comments/{key}",
            put(handlers::edit_comment).delete(handlers::delete_comment),
        )
        .route("/api/comments/{key}/vote", post(handlers::vote_comment))
        .route("/api/comments/{key}/like", post(handlers::toggle_comment_like))
        .route("/api/users/me/stats", get(handlers::my_stats))
        .route("/api/users/me/points", get(handlers::my_points))
        .route("/api/users/me/referral", get(handlers::my_referral))
        .route("/api/users/me/liked", get(handlers::my_liked_content))
        .route("/api/users/leaderboard", get(handlers::leaderboard))
        .route("/api/users/{id}/stats", get(handlers::user_stats))
        .route("/api/admin/dashboard", get(handlers::dashboard))
        .route("/api/admin/audit", get(handlers::list_audit_logs))
        .route("/api/monitoring/metrics", get(handlers::metrics_summary))
        .route(
            "/api/monitoring/metrics/errors",
            get(handlers::recent_errors),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            middleware::api_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::session_auth,
        ))
        .layer(axum_middleware::from_fn_with_state(
            record_state,
            record_requests,
        ))
        .layer(axum_middleware::from_fn(log_responses))
}
