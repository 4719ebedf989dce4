//! Key feed abstraction.
//!
//! A key feed is an ordered, replayable, at-least-once log of
//! `(key id, key material)` records. Readers over such logs keep a stateful
//! cursor that must never be driven from two threads at once, so:
//!
//! - [`KeyFeed::drain`] takes `&mut self`
//! - [`KeyFeedReader`] owns the feed behind a `Mutex` held for the whole drain
//!   and is neither `Clone` nor `Copy`
//!
//! # Drain Semantics
//!
//! Every implementation waits up to `max_wait` for the first record, then
//! collects whatever else is immediately available and returns. A drain
//! never runs past `max_wait` and never returns more than its record cap,
//! however fast records arrive. An empty result is a normal outcome;
//! [`FeedError`] is reserved for infrastructure failure.

use crate::error::FeedError;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default cap on records returned by one drain.
pub const DEFAULT_MAX_DRAIN_RECORDS: usize = 500;

/// A single record read from the key feed.
#[derive(Clone, PartialEq, Eq)]
pub struct FeedRecord {
    /// Key id the record publishes.
    pub key_id: String,

    /// Raw key material, decoded by [`crate::keys::decode_public_key`].
    pub value: Vec<u8>,
}

impl FeedRecord {
    /// Create a record.
    #[must_use]
    pub fn new(key_id: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: key_id.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for FeedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedRecord")
            .field("key_id", &self.key_id)
            .field("value_len", &self.value.len())
            .finish()
    }
}

/// A single-reader cursor over the key feed.
pub trait KeyFeed: Send {
    /// Return the records that become available within `max_wait`.
    ///
    /// Advances the cursor past exactly the records returned. Records not
    /// returned because of the deadline or the record cap stay on the feed
    /// for the next drain.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unavailable` when the feed cannot be read at all.
    fn drain(&mut self, max_wait: Duration) -> Result<Vec<FeedRecord>, FeedError>;
}

/// Exclusive handle around a [`KeyFeed`].
///
/// The lock spans the entire drain, so at most one drain is in flight per
/// reader regardless of how many threads share the owner.
pub struct KeyFeedReader {
    feed: Mutex<Box<dyn KeyFeed>>,
}

impl KeyFeedReader {
    /// Take ownership of a feed.
    #[must_use]
    pub fn new<F>(feed: F) -> Self
    where
        F: KeyFeed + 'static,
    {
        Self {
            feed: Mutex::new(Box::new(feed)),
        }
    }

    /// Lock the feed for the duration of the returned guard.
    ///
    /// Callers that need to do work atomically with respect to other drains
    /// (check cache, drain, insert) hold the guard across all of it.
    pub fn lock(&self) -> FeedGuard<'_> {
        // A panic inside a previous drain leaves the cursor where the feed
        // put it; recovering is no worse than the reader never having run.
        FeedGuard {
            feed: self.feed.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Drain the feed under the reader lock.
    ///
    /// # Errors
    ///
    /// Propagates the underlying feed's [`FeedError`].
    pub fn drain(&self, max_wait: Duration) -> Result<Vec<FeedRecord>, FeedError> {
        self.lock().drain(max_wait)
    }
}

impl fmt::Debug for KeyFeedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFeedReader").finish_non_exhaustive()
    }
}

/// Proof of exclusive access to a [`KeyFeedReader`]'s feed.
pub struct FeedGuard<'a> {
    feed: std::sync::MutexGuard<'a, Box<dyn KeyFeed>>,
}

impl FeedGuard<'_> {
    /// Drain the locked feed.
    ///
    /// # Errors
    ///
    /// Propagates the underlying feed's [`FeedError`].
    #[instrument(skip(self), target = "verifier.feed")]
    pub fn drain(&mut self, max_wait: Duration) -> Result<Vec<FeedRecord>, FeedError> {
        self.feed.drain(max_wait)
    }
}

// =============================================================================
// In-memory feed
// =============================================================================

/// In-process key feed backed by an unbounded channel.
///
/// Useful for embedding the verifier next to the component that mints keys,
/// and for tests. Records published through [`MemoryFeedPublisher`] are
/// delivered exactly once, in publish order.
pub struct MemoryKeyFeed {
    receiver: Receiver<FeedRecord>,
    max_records: usize,
}

/// Producer side of a [`MemoryKeyFeed`]. Cheap to clone.
#[derive(Clone)]
pub struct MemoryFeedPublisher {
    sender: Sender<FeedRecord>,
}

impl MemoryKeyFeed {
    /// Create a feed and its publisher.
    #[must_use]
    pub fn channel() -> (MemoryFeedPublisher, MemoryKeyFeed) {
        let (sender, receiver) = mpsc::channel();
        (
            MemoryFeedPublisher { sender },
            MemoryKeyFeed {
                receiver,
                max_records: DEFAULT_MAX_DRAIN_RECORDS,
            },
        )
    }

    /// Cap the number of records a single drain returns. Zero is clamped to one.
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }
}

impl MemoryFeedPublisher {
    /// Publish a record.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unavailable` if the feed has been dropped.
    pub fn publish(&self, record: FeedRecord) -> Result<(), FeedError> {
        self.sender
            .send(record)
            .map_err(|_| FeedError::Unavailable("memory feed reader dropped".to_string()))
    }

    /// Publish a key id and its base64 SPKI encoding.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unavailable` if the feed has been dropped.
    pub fn publish_key(&self, key_id: &str, spki_b64: &str) -> Result<(), FeedError> {
        self.publish(FeedRecord::new(key_id, spki_b64.as_bytes()))
    }
}

impl KeyFeed for MemoryKeyFeed {
    fn drain(&mut self, max_wait: Duration) -> Result<Vec<FeedRecord>, FeedError> {
        let deadline = Instant::now() + max_wait;
        let mut records = Vec::new();

        // Block for the first record only
        match self
            .receiver
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
        {
            Ok(record) => records.push(record),
            Err(RecvTimeoutError::Timeout) => return Ok(records),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(FeedError::Unavailable(
                    "memory feed publisher dropped".to_string(),
                ))
            }
        }

        while records.len() < self.max_records && Instant::now() < deadline {
            match self.receiver.try_recv() {
                Ok(record) => records.push(record),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        tracing::debug!(
            target: "verifier.feed",
            record_count = records.len(),
            "Drained in-memory key feed"
        );

        Ok(records)
    }
}
