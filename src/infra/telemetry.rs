use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const METRIC_HTTP_REQUESTS: &str = "storyloft_http_requests_total";
pub const METRIC_HTTP_ERRORS: &str = "storyloft_http_errors_total";
pub const METRIC_HTTP_DURATION: &str = "storyloft_http_request_duration_ms";
pub const METRIC_RATE_LIMITED: &str = "storyloft_rate_limited_total";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HTTP_REQUESTS,
            Unit::Count,
            "Total number of API requests by endpoint and status."
        );
        describe_counter!(
            METRIC_HTTP_ERRORS,
            Unit::Count,
            "Total number of API responses with status 400 or above."
        );
        describe_histogram!(
            METRIC_HTTP_DURATION,
            Unit::Milliseconds,
            "API request latency in milliseconds."
        );
        describe_counter!(
            METRIC_RATE_LIMITED,
            Unit::Count,
            "Total number of requests rejected by the rate limiter."
        );
        describe_counter!(
            "storyloft_likes_toggled_total",
            Unit::Count,
            "Total number of like toggles by target kind."
        );
        describe_counter!(
            "storyloft_moderation_decisions_total",
            Unit::Count,
            "Total number of moderation decisions by outcome."
        );
    });
}
