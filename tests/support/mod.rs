#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use storyloft::infra::http::{self, ApiOptions, ApiState, Repositories};
use storyloft::infra::memory::MemoryRepositories;

pub struct TestApp {
    pub state: ApiState,
    router: Router,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct Account {
    pub id: Uuid,
    pub token: String,
    pub refresh_token: String,
    pub referral_code: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(ApiOptions::default())
    }

    pub fn with_options(options: ApiOptions) -> Self {
        Self::with_repositories(Arc::new(MemoryRepositories::new()), options)
    }

    pub fn with_repositories<R: Repositories>(repos: Arc<R>, options: ApiOptions) -> Self {
        let state = ApiState::assemble(repos, options);
        let router = http::build_router(state.clone());
        Self { state, router }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body should be json")
        };
        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn register(&self, username: &str) -> Account {
        self.register_with(json!({ "username": username })).await
    }

    pub async fn register_with(&self, payload: Value) -> Account {
        let res = self.post("/api/auth/register", None, payload).await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {}", res.body);
        Account {
            id: res.body["user"]["id"]
                .as_str()
                .and_then(|id| id.parse().ok())
                .expect("user id"),
            token: res.body["tokens"]["access_token"]
                .as_str()
                .expect("access token")
                .to_string(),
            refresh_token: res.body["tokens"]["refresh_token"]
                .as_str()
                .expect("refresh token")
                .to_string(),
            referral_code: res.body["user"]["referral_code"]
                .as_str()
                .expect("referral code")
                .to_string(),
        }
    }

    pub async fn admin(&self, username: &str) -> Account {
        let account = self.register(username).await;
        self.state
            .accounts
            .grant_admin(username, "test")
            .await
            .expect("grant admin");
        account
    }

    /// Creates a story and drives it through review to `approved`.
    pub async fn approved_story(&self, author: &Account, admin: &Account, title: &str) -> Uuid {
        let created = self
            .post(
                "/api/stories",
                Some(&author.token),
                json!({ "title": title, "body": "Once upon a time.", "submit": true }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        let id: Uuid = created.body["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("story id");

        let approved = self
            .post(
                &format!("/api/stories/{id}/approve"),
                Some(&admin.token),
                json!({ "approved": true }),
            )
            .await;
        assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);
        id
    }
}

pub fn error_code(res: &Response) -> &str {
    res.body["error"]["code"].as_str().unwrap_or_default()
}
