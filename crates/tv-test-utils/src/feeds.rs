//! Scripted key feeds for resolver and verifier tests
//!
//! [`ScriptedFeed`] replays a fixed sequence of drain outcomes and records how
//! it was driven: how many drains ran, with what timeouts, and whether two
//! drains ever overlapped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use token_verifier::error::FeedError;
use token_verifier::{FeedRecord, KeyFeed};

/// One scripted drain outcome.
#[derive(Debug, Clone)]
pub enum DrainStep {
    /// Return these records
    Records(Vec<FeedRecord>),
    /// Fail with `FeedError::Unavailable`
    Fail(String),
}

/// Observations shared between a [`ScriptedFeed`] and the test.
#[derive(Debug, Default)]
pub struct FeedProbe {
    drains: AtomicUsize,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
    waits: Mutex<Vec<Duration>>,
}

impl FeedProbe {
    /// Number of drains started.
    pub fn drain_count(&self) -> usize {
        self.drains.load(Ordering::SeqCst)
    }

    /// Whether a drain ever started while another was running.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// The `max_wait` passed to each drain, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

/// Key feed that replays scripted drain outcomes.
///
/// Once the script is exhausted every drain returns an empty batch
/// immediately, unless `idle_waits` is set, in which case it sleeps for the
/// full `max_wait` like a real feed with nothing new.
pub struct ScriptedFeed {
    steps: VecDeque<DrainStep>,
    delay: Duration,
    idle_waits: bool,
    probe: Arc<FeedProbe>,
}

impl ScriptedFeed {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            delay: Duration::ZERO,
            idle_waits: false,
            probe: Arc::new(FeedProbe::default()),
        }
    }

    /// Append a batch of records.
    pub fn then_records(mut self, records: Vec<FeedRecord>) -> Self {
        self.steps.push_back(DrainStep::Records(records));
        self
    }

    /// Append a batch of `(key id, base64 SPKI)` pairs.
    pub fn then_keys(self, keys: &[(&str, &str)]) -> Self {
        let records = keys
            .iter()
            .map(|(key_id, spki)| FeedRecord::new(*key_id, spki.as_bytes()))
            .collect();
        self.then_records(records)
    }

    /// Append an empty batch.
    pub fn then_empty(self) -> Self {
        self.then_records(Vec::new())
    }

    /// Append a failing drain.
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.steps.push_back(DrainStep::Fail(reason.to_string()));
        self
    }

    /// Sleep this long inside every scripted drain.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Block for the full `max_wait` once the script is exhausted.
    pub fn idle_waits(mut self) -> Self {
        self.idle_waits = true;
        self
    }

    /// Handle for inspecting how the feed was driven.
    pub fn probe(&self) -> Arc<FeedProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for ScriptedFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyFeed for ScriptedFeed {
    fn drain(&mut self, max_wait: Duration) -> Result<Vec<FeedRecord>, FeedError> {
        if self.probe.in_flight.swap(true, Ordering::SeqCst) {
            self.probe.overlapped.store(true, Ordering::SeqCst);
        }
        self.probe.drains.fetch_add(1, Ordering::SeqCst);
        self.probe.waits.lock().unwrap().push(max_wait);

        let result = match self.steps.pop_front() {
            Some(step) => {
                std::thread::sleep(self.delay);
                match step {
                    DrainStep::Records(records) => Ok(records),
                    DrainStep::Fail(reason) => Err(FeedError::Unavailable(reason)),
                }
            }
            None => {
                if self.idle_waits {
                    std::thread::sleep(max_wait);
                }
                Ok(Vec::new())
            }
        };

        self.probe.in_flight.store(false, Ordering::SeqCst);
        result
    }
}
