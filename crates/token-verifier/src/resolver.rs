//! Key id resolution.
//!
//! Turns a key id asserted by an unverified token into key material, via the
//! cache or, on a miss, a single bounded drain of the key feed.
//!
//! ```text
//! resolve(kid)
//!   → cache hit?                       → return
//!   → lock feed reader
//!       → cache hit? (filled by a concurrent resolve) → return
//!       → drain(timeout)  (exactly once)
//!       → decode records, skip bad ones, put_all into cache
//!       → kid in batch? → re-insert last, return
//!   → unlock
//!   → KeyNotFound
//! ```
//!
//! The reader lock is never taken on the cache-hit path, so resolutions of
//! already-known keys never wait on a drain.

use crate::cache::KeyCache;
use crate::error::ResolveError;
use crate::feed::{FeedRecord, KeyFeed, KeyFeedReader};
use crate::keys::{decode_public_key, PublicKeyMaterial};
use crate::observability::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default upper bound on a single feed drain.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves key ids against the cache, draining the feed on a miss.
pub struct KeyResolver {
    cache: Arc<KeyCache>,
    reader: KeyFeedReader,
    drain_timeout: Duration,
}

impl KeyResolver {
    /// Create a resolver that owns `feed` and fills `cache`.
    #[must_use]
    pub fn new<F>(cache: Arc<KeyCache>, feed: F) -> Self
    where
        F: KeyFeed + 'static,
    {
        Self {
            cache,
            reader: KeyFeedReader::new(feed),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Override the drain timeout.
    #[must_use]
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// The cache this resolver fills.
    #[must_use]
    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Configured drain timeout.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Resolve a key id to key material.
    ///
    /// Performs at most one feed drain per call.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` - the key is neither cached nor delivered by the drain
    /// - `FeedUnavailable` - the drain failed outright
    #[instrument(skip(self), target = "verifier.resolver", fields(key_id = %key_id))]
    pub fn resolve(&self, key_id: &str) -> Result<Arc<PublicKeyMaterial>, ResolveError> {
        if let Some(material) = self.cache.get(key_id) {
            metrics::record_cache_lookup(true);
            tracing::trace!(target: "verifier.resolver", "Key cache hit");
            return Ok(material);
        }
        metrics::record_cache_lookup(false);

        {
            let mut feed = self.reader.lock();

            // Another resolve may have filled the key while we waited
            if let Some(material) = self.cache.get(key_id) {
                tracing::debug!(
                    target: "verifier.resolver",
                    "Key filled by concurrent drain, skipping own drain"
                );
                return Ok(material);
            }

            tracing::debug!(
                target: "verifier.resolver",
                timeout_ms = self.drain_timeout.as_millis(),
                "Key cache miss, draining key feed"
            );

            let started = Instant::now();
            let records = feed.drain(self.drain_timeout).map_err(|e| {
                metrics::record_feed_drain("error", started.elapsed());
                tracing::warn!(target: "verifier.resolver", error = %e, "Key feed drain failed");
                ResolveError::from(e)
            })?;
            let status = if records.is_empty() { "empty" } else { "success" };
            metrics::record_feed_drain(status, started.elapsed());

            if let Some(material) = self.absorb(records, key_id) {
                return Ok(material);
            }
        }

        tracing::debug!(
            target: "verifier.resolver",
            cached_keys = self.cache.len(),
            "Key not found after feed drain"
        );
        Err(ResolveError::KeyNotFound)
    }

    /// Decode drained records and insert the valid ones into the cache.
    ///
    /// Malformed records are logged and skipped. Returns the last valid
    /// material delivered for `key_id`, which is written last so that the
    /// rest of the batch cannot evict it.
    fn absorb(&self, records: Vec<FeedRecord>, key_id: &str) -> Option<Arc<PublicKeyMaterial>> {
        let total = records.len();
        let decoded: Vec<(String, Arc<PublicKeyMaterial>)> = records
            .into_iter()
            .filter_map(|record| match decode_public_key(&record.value) {
                Ok(material) => Some((record.key_id, Arc::new(material))),
                Err(e) => {
                    tracing::warn!(
                        target: "verifier.resolver",
                        key_id = %record.key_id,
                        error = %e,
                        "Skipping undecodable key feed record"
                    );
                    None
                }
            })
            .collect();

        let accepted = decoded.len();
        metrics::record_feed_records(accepted, total - accepted);

        let requested = decoded
            .iter()
            .rev()
            .find(|(id, _)| id == key_id)
            .map(|(_, material)| Arc::clone(material));

        self.cache.put_all(decoded);
        if let Some(material) = &requested {
            self.cache.put(key_id.to_string(), Arc::clone(material));
        }

        tracing::debug!(
            target: "verifier.resolver",
            accepted,
            rejected = total - accepted,
            cached_keys = self.cache.len(),
            "Key feed records absorbed"
        );

        requested
    }
}

impl std::fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyResolver")
            .field("cached_keys", &self.cache.len())
            .field("drain_timeout", &self.drain_timeout)
            .finish_non_exhaustive()
    }
}
