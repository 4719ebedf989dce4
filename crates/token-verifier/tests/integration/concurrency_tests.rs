//! Concurrent verification: cached keys never touch the feed, misses never
//! drain in parallel.

use crate::harness::{verifier_over, NameHolder};
use std::sync::Barrier;
use std::time::Duration;
use token_verifier::VerifyError;
use tv_test_utils::*;

const THREADS: usize = 8;

fn token_for(key_id: &str) -> String {
    TestTokenBuilder::new()
        .with_key_id(key_id)
        .with_data(&NameHolder::new(key_id))
        .build()
}

#[test]
fn test_concurrent_cached_verifications_never_drain() {
    let feed = ScriptedFeed::new()
        .then_keys(&[("key-42", test_public_key_b64(1))])
        .idle_waits();
    let probe = feed.probe();
    let verifier = verifier_over(feed, 10, Duration::from_secs(5));
    let token = token_for("key-42");

    verifier.verify::<NameHolder>(&token).assert_verified();
    assert_eq!(probe.drain_count(), 1);

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..25 {
                    verifier
                        .verify::<NameHolder>(&token)
                        .assert_verified_as(&NameHolder::new("key-42"));
                }
            });
        }
    });

    assert_eq!(probe.drain_count(), 1);
}

#[test]
fn test_cached_lookup_is_not_blocked_by_running_drain() {
    // The second drain idles for the full timeout
    let feed = ScriptedFeed::new()
        .then_keys(&[("key-42", test_public_key_b64(1))])
        .idle_waits();
    let verifier = verifier_over(feed, 10, Duration::from_millis(500));
    let cached = token_for("key-42");
    verifier.verify::<NameHolder>(&cached).assert_verified();

    let barrier = Barrier::new(2);
    std::thread::scope(|s| {
        let missing = s.spawn(|| {
            barrier.wait();
            verifier.verify::<NameHolder>(&token_for("missing"))
        });

        barrier.wait();
        std::thread::sleep(Duration::from_millis(50));
        let started = std::time::Instant::now();
        verifier.verify::<NameHolder>(&cached).assert_verified();
        assert!(
            started.elapsed() < Duration::from_millis(250),
            "Cached lookup waited on the drain"
        );

        missing
            .join()
            .unwrap()
            .assert_rejected_with(VerifyError::KeyNotFound);
    });
}

#[test]
fn test_concurrent_misses_on_same_key_share_one_drain() {
    let feed = ScriptedFeed::new()
        .then_keys(&[("key-42", test_public_key_b64(1))])
        .with_delay(Duration::from_millis(100));
    let probe = feed.probe();
    let verifier = verifier_over(feed, 10, Duration::from_secs(1));
    let token = token_for("key-42");
    let barrier = Barrier::new(THREADS);

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                verifier
                    .verify::<NameHolder>(&token)
                    .assert_verified_as(&NameHolder::new("key-42"));
            });
        }
    });

    assert_eq!(probe.drain_count(), 1);
    assert!(!probe.overlapped());
}

#[test]
fn test_concurrent_misses_on_distinct_keys_never_overlap() {
    let feed = ScriptedFeed::new().idle_waits();
    let probe = feed.probe();
    let verifier = verifier_over(feed, 10, Duration::from_millis(30));
    let barrier = Barrier::new(4);

    std::thread::scope(|s| {
        for i in 0..4 {
            let verifier = &verifier;
            let barrier = &barrier;
            s.spawn(move || {
                let token = token_for(&format!("missing-{i}"));
                barrier.wait();
                verifier
                    .verify::<NameHolder>(&token)
                    .assert_rejected_with(VerifyError::KeyNotFound);
            });
        }
    });

    assert_eq!(probe.drain_count(), 4);
    assert!(!probe.overlapped());
}
