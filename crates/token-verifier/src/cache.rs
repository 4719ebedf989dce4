//! Bounded key-id to public-key cache.
//!
//! The cache is the only state shared between concurrent verifications. It is
//! constructed once, wrapped in an `Arc`, and handed to the resolver.
//!
//! # Concurrency
//!
//! - Lookups take the read lock and use `LruCache::peek`, so cache hits never
//!   contend with each other
//! - Inserts take the write lock; at capacity the least recently *written*
//!   entry is evicted
//! - Entries never expire on a time basis

use crate::keys::PublicKeyMaterial;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, PoisonError, RwLock};

/// Default maximum number of cached keys.
pub const DEFAULT_KEY_CACHE_CAPACITY: usize = 1000;

/// Thread-safe, capacity-bounded map of key id to [`PublicKeyMaterial`].
pub struct KeyCache {
    entries: RwLock<LruCache<String, Arc<PublicKeyMaterial>>>,
    capacity: NonZeroUsize,
}

impl KeyCache {
    /// Create a cache holding at most `capacity` keys.
    ///
    /// A capacity of zero is clamped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Look up a key by id.
    #[must_use]
    pub fn get(&self, key_id: &str) -> Option<Arc<PublicKeyMaterial>> {
        // A poisoned lock only means another thread panicked mid-call; LruCache
        // operations leave the map consistent, so keep serving from it.
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.peek(key_id).cloned()
    }

    /// Insert or overwrite a key. Last write wins.
    pub fn put(&self, key_id: String, material: Arc<PublicKeyMaterial>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        insert(&mut entries, key_id, material);
    }

    /// Insert a batch of keys under a single write lock.
    ///
    /// Later items overwrite earlier ones with the same id.
    pub fn put_all<I>(&self, items: I)
    where
        I: IntoIterator<Item = (String, Arc<PublicKeyMaterial>)>,
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key_id, material) in items {
            insert(&mut entries, key_id, material);
        }
    }

    /// Whether a key id is currently cached.
    #[must_use]
    pub fn contains(&self, key_id: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains(key_id)
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    /// Whether the cache holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of keys this cache holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_CACHE_CAPACITY)
    }
}

fn insert(
    entries: &mut LruCache<String, Arc<PublicKeyMaterial>>,
    key_id: String,
    material: Arc<PublicKeyMaterial>,
) {
    if let Some((evicted, _)) = entries.push(key_id.clone(), material) {
        if evicted != key_id {
            tracing::debug!(
                target: "verifier.cache",
                evicted_key_id = %evicted,
                "Key cache at capacity, evicted oldest entry"
            );
        }
    }
}
