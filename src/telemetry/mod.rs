//! # Telemetry
//!
//! Counters and histograms emitted through the `metrics` facade. No recorder
//! is installed here; a host application that wants the numbers installs one
//! (Prometheus or otherwise) before starting the engine.
//!
//! **Counters:**
//! - `lens_changes_total{disposition}` - edit events by classification result
//! - `lens_debounce_coalesced_total{channel}` - events replaced before firing
//! - `lens_requests_total{backend, task, outcome}` - terminal pipeline outcomes
//! - `lens_secondary_starts_total{result}` - secondary process launches
//! - `lens_store_writes_total{result}` - statistics file writes
//!
//! **Histograms:**
//! - `lens_response_seconds{backend, task}` - request latency

use std::time::Duration;

pub const CHANGES_TOTAL: &str = "lens_changes_total";
pub const DEBOUNCE_COALESCED_TOTAL: &str = "lens_debounce_coalesced_total";
pub const REQUESTS_TOTAL: &str = "lens_requests_total";
pub const RESPONSE_SECONDS: &str = "lens_response_seconds";
pub const SECONDARY_STARTS_TOTAL: &str = "lens_secondary_starts_total";
pub const STORE_WRITES_TOTAL: &str = "lens_store_writes_total";

pub fn record_change(disposition: &'static str) {
    metrics::counter!(CHANGES_TOTAL, "disposition" => disposition).increment(1);
}

pub fn record_coalesced(channel: &'static str) {
    metrics::counter!(DEBOUNCE_COALESCED_TOTAL, "channel" => channel).increment(1);
}

pub fn record_request(backend: &str, task: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "backend" => backend.to_string(),
        "task" => task,
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!(
        RESPONSE_SECONDS,
        "backend" => backend.to_string(),
        "task" => task,
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_secondary_start(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(SECONDARY_STARTS_TOTAL, "result" => result).increment(1);
}

pub fn record_store_write(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(STORE_WRITES_TOTAL, "result" => result).increment(1);
}
