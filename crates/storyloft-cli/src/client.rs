use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storyloft_api_types::{
    ContentKind, LikeResponse, LikedResponse, RefreshRequest, TokenResponse, VoteDirection,
    VoteRequest, VoteResponse,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ClientError;
use crate::optimistic::{LikeState, Optimistic, VoteState};
use crate::session::{Session, SessionStore};

const REFRESH_PATH: &str = "api/auth/refresh";

/// HTTP client for the Storyloft API.
///
/// Every authenticated call gets exactly one refresh-and-retry on `401`.
/// Concurrent callers that fail with the same access token share a single
/// refresh: they queue on `refresh_lock` and skip the refresh when the token
/// has already been replaced by the time they acquire it.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base: Url,
    session: SessionStore,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(site: &str, session: SessionStore) -> Result<Self, ClientError> {
        let base = Url::parse(site)?.join("/")?;
        let http = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            http,
            base,
            session,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("storyloft-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self.execute(Method::GET, path, query, None).await?;
        decode(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        let response = self.execute(Method::POST, path, &[], Some(body)).await?;
        decode(response).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        let response = self.execute(Method::PUT, path, &[], Some(body)).await?;
        decode(response).await
    }

    /// Sends a request whose success response carries no body.
    pub async fn send_unit(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ClientError> {
        let response = self.execute(method, path, &[], body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await?;
        Err(ClientError::from_response(status, &bytes))
    }

    /// Sends without credentials and stores the returned tokens.
    pub async fn post_anonymous<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(self.url(path, &[])?)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn store_tokens(&self, tokens: TokenResponse) -> Result<(), ClientError> {
        self.session.replace(Session::from(tokens)).await
    }

    pub async fn toggle_like(&self, kind: ContentKind, id: Uuid) -> Result<LikeResponse, ClientError> {
        let path = format!("api/{}/{id}/like", kind.collection());
        self.post(&path, &serde_json::json!({})).await
    }

    pub async fn is_liked(&self, kind: ContentKind, id: Uuid) -> Result<bool, ClientError> {
        let path = format!("api/{}/{id}/liked", kind.collection());
        let response: LikedResponse = self.get(&path, &[]).await?;
        Ok(response.liked)
    }

    pub async fn vote_comment(
        &self,
        comment_id: Uuid,
        vote: VoteDirection,
    ) -> Result<VoteResponse, ClientError> {
        let path = format!("api/comments/{comment_id}/vote");
        self.post(&path, &VoteRequest { vote }).await
    }

    /// Toggles a like with the displayed state updated ahead of the server.
    pub async fn toggle_like_optimistic(
        &self,
        state: &mut Optimistic<LikeState>,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<LikeResponse, ClientError> {
        let tentative = state.get().toggled();
        state
            .run(tentative, self.toggle_like(kind, id), |_, response| {
                LikeState::from(*response)
            })
            .await
    }

    pub async fn vote_optimistic(
        &self,
        state: &mut Optimistic<VoteState>,
        comment_id: Uuid,
        vote: VoteDirection,
    ) -> Result<VoteResponse, ClientError> {
        let tentative = state.get().cast(vote);
        state
            .run(tentative, self.vote_comment(comment_id, vote), |_, response| {
                VoteState::from(*response)
            })
            .await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<Response, ClientError> {
        let url = self.url(path, query)?;
        let token = self.session.access_token().await;
        let response = self
            .dispatch(method.clone(), url.clone(), body.as_ref(), token.as_deref())
            .await?;

        let Some(failed_token) = token else {
            return Ok(response);
        };
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.refresh_after_unauthorized(&failed_token).await?;

        let token = self.session.access_token().await;
        let retry = self
            .dispatch(method, url, body.as_ref(), token.as_deref())
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            self.session.clear().await?;
        }
        Ok(retry)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn refresh_after_unauthorized(&self, failed_token: &str) -> Result<(), ClientError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(current) = self.session.current().await else {
            return Err(ClientError::Authentication("session expired".to_string()));
        };
        if current.access_token != failed_token {
            // Another caller refreshed while we waited.
            return Ok(());
        }

        let request = RefreshRequest {
            refresh_token: current.refresh_token,
        };
        let response = self
            .http
            .post(self.url(REFRESH_PATH, &[])?)
            .json(&request)
            .send()
            .await;

        let tokens = match response {
            Ok(response) => decode::<TokenResponse>(response).await,
            Err(err) => Err(ClientError::Network(err)),
        };

        match tokens {
            Ok(tokens) => self.store_tokens(tokens).await,
            Err(err @ ClientError::Network(_)) => Err(err),
            Err(err) => {
                self.session.clear().await?;
                Err(ClientError::Authentication(err.to_string()))
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(ClientError::from_response(status, &bytes));
    }
    Ok(serde_json::from_slice(&bytes)?)
}
