//! Metric recording functions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `tv_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! No exporter is installed here; the embedding process picks one.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a key cache lookup.
///
/// Metric: `tv_key_cache_lookups_total`
/// Labels: `result` (hit, miss)
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("tv_key_cache_lookups_total", "result" => result).increment(1);
}

/// Record a completed feed drain.
///
/// Metric: `tv_feed_drains_total`, `tv_feed_drain_duration_seconds`
/// Labels: `status` (success, empty, error)
pub fn record_feed_drain(status: &'static str, duration: Duration) {
    counter!("tv_feed_drains_total", "status" => status).increment(1);
    histogram!("tv_feed_drain_duration_seconds").record(duration.as_secs_f64());
}

/// Record feed records that were decoded into the cache or skipped.
///
/// Metric: `tv_feed_records_total`
/// Labels: `outcome` (accepted, rejected)
pub fn record_feed_records(accepted: usize, rejected: usize) {
    if accepted > 0 {
        counter!("tv_feed_records_total", "outcome" => "accepted").increment(accepted as u64);
    }
    if rejected > 0 {
        counter!("tv_feed_records_total", "outcome" => "rejected").increment(rejected as u64);
    }
}

/// Record the outcome of a `verify` call.
///
/// Metric: `tv_verifications_total`
/// Labels: `status` ("success" or a `VerifyError::kind`)
pub fn record_verification(status: &'static str) {
    counter!("tv_verifications_total", "status" => status).increment(1);
}
