//! Verification against the in-process channel feed.

use crate::harness::{verifier_over, NameHolder};
use std::time::Duration;
use token_verifier::{MemoryKeyFeed, VerifyError};
use tv_test_utils::*;

#[test]
fn test_key_published_before_first_verify_is_discovered() {
    let (publisher, feed) = MemoryKeyFeed::channel();
    let verifier = verifier_over(feed, 10, Duration::from_millis(200));
    publisher
        .publish_key("key-42", test_public_key_b64(1))
        .unwrap();

    let token = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&NameHolder::new("a"))
        .build();

    verifier
        .verify::<NameHolder>(&token)
        .assert_verified_as(&NameHolder::new("a"));
}

#[test]
fn test_key_published_during_drain_is_discovered() {
    let (publisher, feed) = MemoryKeyFeed::channel();
    let verifier = verifier_over(feed, 10, Duration::from_secs(5));
    let token = TestTokenBuilder::new()
        .with_key_id("key-42")
        .with_data(&NameHolder::new("late"))
        .build();

    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(50));
            publisher
                .publish_key("key-42", test_public_key_b64(1))
                .unwrap();
        });

        verifier
            .verify::<NameHolder>(&token)
            .assert_verified_as(&NameHolder::new("late"));
    });
}

#[test]
fn test_dropped_publisher_is_feed_unavailable() {
    let (publisher, feed) = MemoryKeyFeed::channel();
    let verifier = verifier_over(feed, 10, Duration::from_millis(50));
    drop(publisher);

    let token = TestTokenBuilder::new().with_key_id("key-42").build();
    verifier
        .verify::<serde_json::Value>(&token)
        .assert_rejected_with(VerifyError::FeedUnavailable);
}
