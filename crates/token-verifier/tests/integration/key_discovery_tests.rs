//! Key discovery over the feed: single bounded drain, skipping bad records,
//! last write wins, infrastructure failure.

use crate::harness::{verifier, verifier_over, NameHolder};
use std::time::{Duration, Instant};
use token_verifier::{FeedRecord, VerifyError};
use tv_test_utils::*;

fn token_for(key_id: &str, seed: u8) -> String {
    TestTokenBuilder::new()
        .with_key_id(key_id)
        .with_data(&NameHolder::new(key_id))
        .signed_with(seed)
        .build()
}

#[test]
fn test_unknown_key_fails_after_exactly_one_bounded_drain() {
    let feed = ScriptedFeed::new().idle_waits();
    let probe = feed.probe();
    let timeout = Duration::from_millis(150);
    let verifier = verifier_over(feed, 10, timeout);

    let started = Instant::now();
    verifier
        .verify::<NameHolder>(&token_for("never-published", 1))
        .assert_rejected_with(VerifyError::KeyNotFound);
    let elapsed = started.elapsed();

    assert_eq!(probe.drain_count(), 1);
    assert_eq!(probe.waits(), vec![timeout]);
    assert!(elapsed >= timeout, "Drain returned before timeout: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "Drain hung: {:?}", elapsed);
}

#[test]
fn test_each_miss_drains_once_more() {
    let feed = ScriptedFeed::new();
    let probe = feed.probe();
    let verifier = verifier(feed);

    for expected in 1..=3 {
        verifier
            .verify::<NameHolder>(&token_for("never-published", 1))
            .assert_rejected_with(VerifyError::KeyNotFound);
        assert_eq!(probe.drain_count(), expected);
    }
}

#[test]
fn test_drained_unrelated_keys_are_cached() {
    let feed = ScriptedFeed::new()
        .then_keys(&[("key-a", test_public_key_b64(1)), ("key-b", test_public_key_b64(2))]);
    let probe = feed.probe();
    let verifier = verifier(feed);

    verifier.verify::<NameHolder>(&token_for("key-a", 1)).assert_verified();
    verifier.verify::<NameHolder>(&token_for("key-b", 2)).assert_verified();

    assert_eq!(probe.drain_count(), 1);
    assert!(verifier.resolver().cache().contains("key-b"));
}

#[test]
fn test_key_published_in_later_drain_is_found() {
    let feed = ScriptedFeed::new()
        .then_empty()
        .then_keys(&[("late", test_public_key_b64(1))]);
    let probe = feed.probe();
    let verifier = verifier(feed);
    let token = token_for("late", 1);

    verifier
        .verify::<NameHolder>(&token)
        .assert_rejected_with(VerifyError::KeyNotFound);
    verifier.verify::<NameHolder>(&token).assert_verified();
    assert_eq!(probe.drain_count(), 2);
}

#[test]
fn test_malformed_records_are_skipped() {
    let feed = ScriptedFeed::new().then_records(vec![
        FeedRecord::new("junk", b"!!not base64!!".to_vec()),
        FeedRecord::new("binary", vec![0xff, 0xfe, 0x00]),
        FeedRecord::new("weak", WEAK_PUBLIC_KEY_B64.as_bytes()),
        FeedRecord::new("key-42", test_public_key_b64(1).as_bytes()),
    ]);
    let verifier = verifier(feed);

    verifier.verify::<NameHolder>(&token_for("key-42", 1)).assert_verified();

    let cache = verifier.resolver().cache();
    assert_eq!(cache.len(), 1);
    assert!(!cache.contains("junk"));
    assert!(!cache.contains("binary"));
    assert!(!cache.contains("weak"));
}

#[test]
fn test_later_record_for_same_key_id_wins() {
    let feed = ScriptedFeed::new()
        .then_keys(&[("key-42", test_public_key_b64(1))])
        .then_keys(&[("key-42", test_public_key_b64(2))]);
    let verifier = verifier(feed);

    verifier.verify::<NameHolder>(&token_for("key-42", 1)).assert_verified();

    // A miss on another id pulls the rotated key-42
    verifier
        .verify::<NameHolder>(&token_for("other", 1))
        .assert_rejected_with(VerifyError::KeyNotFound);

    verifier
        .verify::<NameHolder>(&token_for("key-42", 1))
        .assert_rejected_with(VerifyError::VerificationFailed);
    verifier.verify::<NameHolder>(&token_for("key-42", 2)).assert_verified();
}

#[test]
fn test_feed_failure_is_feed_unavailable_and_recoverable() {
    let feed = ScriptedFeed::new()
        .then_fail("broker unreachable")
        .then_keys(&[("key-42", test_public_key_b64(1))]);
    let verifier = verifier(feed);
    let token = token_for("key-42", 1);

    verifier
        .verify::<NameHolder>(&token)
        .assert_rejected_with(VerifyError::FeedUnavailable);
    verifier.verify::<NameHolder>(&token).assert_verified();
}

#[test]
fn test_feed_failure_does_not_affect_cached_keys() {
    let feed = ScriptedFeed::new()
        .then_keys(&[("key-42", test_public_key_b64(1))])
        .then_fail("broker unreachable");
    let verifier = verifier(feed);
    let token = token_for("key-42", 1);

    verifier.verify::<NameHolder>(&token).assert_verified();
    verifier
        .verify::<NameHolder>(&token_for("other", 1))
        .assert_rejected_with(VerifyError::FeedUnavailable);
    verifier.verify::<NameHolder>(&token).assert_verified();
}
