//! Observability for the token verifier.
//!
//! # Privacy by Default
//!
//! Tokens, payload data and key bytes are never recorded. Key ids appear in
//! debug/warn logs only. Metric labels are bounded:
//! - `result`: hit, miss
//! - `status`: success, empty, error (drains) / success or a `VerifyError` kind
//! - `outcome`: accepted, rejected
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `tv_key_cache_lookups_total` | Counter | `result` | Cache effectiveness |
//! | `tv_feed_drains_total` | Counter | `status` | Drain volume and failures |
//! | `tv_feed_drain_duration_seconds` | Histogram | none | Time spent blocked on the feed |
//! | `tv_feed_records_total` | Counter | `outcome` | Malformed key records |
//! | `tv_verifications_total` | Counter | `status` | Verification outcomes |

pub mod metrics;
