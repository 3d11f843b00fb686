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

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so the replay report on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "catalog_cache_hit_total",
            Unit::Count,
            "Total number of cache reads that found an entry."
        );
        describe_counter!(
            "catalog_cache_miss_total",
            Unit::Count,
            "Total number of cache reads that found no entry."
        );
        describe_counter!(
            "catalog_cache_write_total",
            Unit::Count,
            "Total number of entries written without expiry."
        );
        describe_counter!(
            "catalog_cache_clear_total",
            Unit::Count,
            "Total number of entries removed by key or tag flush."
        );
        describe_counter!(
            "catalog_cache_list_patch_total",
            Unit::Count,
            "Incremental list patches by operation and outcome."
        );
        describe_counter!(
            "catalog_cache_list_rebuild_total",
            Unit::Count,
            "Product lists rebuilt from the source of truth."
        );
        describe_histogram!(
            "catalog_cache_event_ms",
            Unit::Milliseconds,
            "Model event dispatch latency in milliseconds."
        );
    });
}
