use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::banners::{
    METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_WRITE_ERROR,
    METRIC_RESOLVE_MS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

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
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
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
            METRIC_CACHE_HIT,
            Unit::Count,
            "Banner resolutions served from the cache index."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Banner resolutions that fell through to the store."
        );
        describe_counter!(
            METRIC_CACHE_ERROR,
            Unit::Count,
            "Cache reads that failed and fell back to the store."
        );
        describe_counter!(
            METRIC_CACHE_WRITE_ERROR,
            Unit::Count,
            "Best-effort cache write-backs that failed."
        );
        describe_histogram!(
            METRIC_RESOLVE_MS,
            Unit::Milliseconds,
            "Banner resolution latency in milliseconds."
        );
    });
}
