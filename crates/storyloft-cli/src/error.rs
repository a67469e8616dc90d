use reqwest::StatusCode;
use storyloft_api_types::ApiErrorBody;
use thiserror::Error;

/// Failures surfaced by the client, grouped the same way the server reports them.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("site URL is required (use --site or STORYLOFT_SITE_URL)")]
    MissingSite,
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("authentication required: {0}")]
    Authentication(String),
    #[error("not allowed: {0}")]
    Authorization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("session file {path}: {source}")]
    SessionFile {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Classifies a non-success response, preferring the server's error message.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ApiErrorBody>(body)
            .map(|parsed| parsed.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(message),
            StatusCode::UNAUTHORIZED => Self::Authentication(message),
            StatusCode::FORBIDDEN => Self::Authorization(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(message),
            other => Self::Server {
                status: other.as_u16(),
                message,
            },
        }
    }

    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}
