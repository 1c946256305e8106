use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("broadcast_gateway_statds")
        .with_description("Broadcast gateway statistics")
        .with_unit("attempt")
        .build()
});

fn incr_statds(metric: String, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

pub fn incr_broadcast_statds(outcome: &str) {
    incr_statds("broadcast".to_string(), outcome.into())
}

pub fn incr_media_upload_statds(outcome: &str) {
    incr_statds("media_upload".to_string(), outcome.into())
}

pub fn incr_retraction_statds(outcome: &str) {
    incr_statds("retraction".to_string(), outcome.into())
}

pub fn incr_token_refresh_statds(outcome: &str) {
    incr_statds("token_refresh".to_string(), outcome.into())
}

pub fn incr_webhook_statds(outcome: &str) {
    incr_statds("webhook".to_string(), outcome.into())
}
