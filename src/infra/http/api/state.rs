use std::sync::Arc;
use std::time::Duration;

use crate::application::accounts::AccountService;
use crate::application::audit::AuditService;
use crate::application::chapters::ChapterService;
use crate::application::comments::CommentService;
use crate::application::content::{ContentOptions, ContentService};
use crate::application::engagement::EngagementService;
use crate::application::monitoring::{DEFAULT_ERROR_CAPACITY, MonitoringService, RequestRecorder};
use crate::application::points::PointsService;
use crate::application::repos::{
    AuditRepo, ChaptersRepo, CommentsRepo, ContentRepo, EngagementRepo, MatureAckRepo,
    PointsRepo, SessionsRepo, UsersRepo,
};
use crate::application::sessions::{SessionPolicy, SessionService};
use crate::config::Settings;
use crate::infra::db::PostgresRepositories;
use crate::infra::error::InfraError;

use super::rate_limit::ApiRateLimiter;

/// Every repository port the services need, implemented by one store.
pub trait Repositories:
    UsersRepo
    + ContentRepo
    + ChaptersRepo
    + CommentsRepo
    + EngagementRepo
    + PointsRepo
    + SessionsRepo
    + MatureAckRepo
    + AuditRepo
    + 'static
{
}

impl<T> Repositories for T where
    T: UsersRepo
        + ContentRepo
        + ChaptersRepo
        + CommentsRepo
        + EngagementRepo
        + PointsRepo
        + SessionsRepo
        + MatureAckRepo
        + AuditRepo
        + 'static
{
}

/// Runtime knobs for the API surface.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub sessions: SessionPolicy,
    pub content: ContentOptions,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub trust_forwarded_for: bool,
    pub error_buffer: usize,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            sessions: SessionPolicy::default(),
            content: ContentOptions::default(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_requests: 120,
            trust_forwarded_for: false,
            error_buffer: DEFAULT_ERROR_CAPACITY,
        }
    }
}

impl ApiOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self, InfraError> {
        let ttl = |value: Duration, key: &str| {
            time::Duration::try_from(value)
                .map_err(|err| InfraError::configuration(format!("{key}: {err}")))
        };
        Ok(Self {
            sessions: SessionPolicy {
                access_ttl: ttl(settings.sessions.access_ttl, "sessions.access_ttl")?,
                refresh_ttl: ttl(settings.sessions.refresh_ttl, "sessions.refresh_ttl")?,
            },
            content: ContentOptions {
                submit_on_create: settings.moderation.submit_on_create,
                public_base_url: settings.site.public_base_url.clone(),
            },
            rate_limit_window: Duration::from_secs(u64::from(
                settings.api_rate_limit.window_seconds.get(),
            )),
            rate_limit_max_requests: settings.api_rate_limit.max_requests.get(),
            trust_forwarded_for: settings.api_rate_limit.trust_forwarded_for,
            error_buffer: settings.monitoring.error_buffer,
        })
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub accounts: Arc<AccountService>,
    pub sessions: Arc<SessionService>,
    pub content: Arc<ContentService>,
    pub chapters: Arc<ChapterService>,
    pub comments: Arc<CommentService>,
    pub engagement: Arc<EngagementService>,
    pub points: Arc<PointsService>,
    pub audit: Arc<AuditService>,
    pub monitoring: Arc<MonitoringService>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    /// Present when backed by Postgres; drives `/health`.
    pub db: Option<Arc<PostgresRepositories>>,
}

impl ApiState {
    /// Wires every service over a single store.
    pub fn assemble<R: Repositories>(store: Arc<R>, options: ApiOptions) -> Self {
        let users: Arc<dyn UsersRepo> = store.clone();
        let content_repo: Arc<dyn ContentRepo> = store.clone();
        let chapters_repo: Arc<dyn ChaptersRepo> = store.clone();
        let engagement_repo: Arc<dyn EngagementRepo> = store.clone();

        let audit = AuditService::new(store.clone());
        let sessions = SessionService::new(store.clone(), users.clone(), options.sessions);
        let accounts = AccountService::new(users.clone(), sessions.clone(), audit.clone());
        let public_base_url = options.content.public_base_url.clone();
        let content = ContentService::new(
            content_repo.clone(),
            chapters_repo.clone(),
            users.clone(),
            store.clone(),
            audit.clone(),
            options.content,
        );
        let chapters = ChapterService::new(chapters_repo, content_repo);
        let comments = CommentService::new(
            store.clone(),
            engagement_repo.clone(),
            users.clone(),
            content.clone(),
            chapters.clone(),
        );
        let engagement = EngagementService::new(engagement_repo, content.clone(), comments.clone());
        let points = PointsService::new(store.clone(), users.clone(), public_base_url);
        let recorder = Arc::new(RequestRecorder::new(options.error_buffer));
        let monitoring = MonitoringService::new(recorder, users);

        Self {
            accounts: Arc::new(accounts),
            sessions: Arc::new(sessions),
            content: Arc::new(content),
            chapters: Arc::new(chapters),
            comments: Arc::new(comments),
            engagement: Arc::new(engagement),
            points: Arc::new(points),
            audit: Arc::new(audit),
            monitoring: Arc::new(monitoring),
            rate_limiter: Arc::new(
                ApiRateLimiter::new(options.rate_limit_window, options.rate_limit_max_requests)
                    .trust_forwarded_for(options.trust_forwarded_for),
            ),
            db: None,
        }
    }

    pub fn with_database(mut self, db: Arc<PostgresRepositories>) -> Self {
        self.db = Some(db);
        self
    }
}
